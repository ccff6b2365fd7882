//! Run IDs for ranking requests.
//!
//! Every ranking request gets a fresh ULID (`meta.match_run_id`) so the
//! caller can correlate a result set with the log lines and metrics it
//! produced. The process-level ID groups requests served by one instance.

use once_cell::sync::Lazy;
use ulid::Ulid;

/// Process-level ID, generated once at first access.
static PROCESS_RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Returns the process-level run ID. Time-ordered, 26 characters, URL-safe.
#[inline]
pub fn process_id() -> &'static str {
    &PROCESS_RUN_ID
}

/// Generates a fresh ULID for one ranking request.
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
