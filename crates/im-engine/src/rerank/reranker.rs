//! Shortlist reranking with bounded in-flight calls.
//!
//! Each pair call carries its own timeout capped by the request deadline;
//! a failed pair degrades that pair only and the rest of the shortlist
//! proceeds. Results come back slot-addressed so the caller's ordering never
//! depends on task completion order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::warn;

use super::CrossEncoder;
use crate::matching::explanation::{DegradedReason, SignalScore};

/// Score every shortlist pair against the anchor. Returns `(slot, outcome)`
/// for every input pair; slots the caller does not get back (a panicked
/// task) should be treated as unavailable.
pub async fn rerank_shortlist(
    encoder: Arc<dyn CrossEncoder>,
    anchor_text: Arc<str>,
    pairs: Vec<(usize, Arc<str>)>,
    concurrency: usize,
    per_call_timeout: Duration,
    deadline: Instant,
) -> Vec<(usize, SignalScore)> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (slot, candidate_text) in pairs {
        let encoder = Arc::clone(&encoder);
        let anchor_text = Arc::clone(&anchor_text);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;

            let now = Instant::now();
            if now >= deadline {
                return (slot, SignalScore::Degraded(DegradedReason::DeadlineExceeded));
            }

            let call_deadline = deadline.min(now + per_call_timeout);
            let outcome = match timeout_at(call_deadline, encoder.score_pair(&anchor_text, &candidate_text)).await {
                Ok(Ok(score)) => SignalScore::Available(score.clamp(0.0, 100.0)),
                Ok(Err(err)) => {
                    warn!(slot, error = %err, "cross-encoder pair failed; keeping blended order");
                    SignalScore::Degraded(DegradedReason::Unavailable)
                }
                Err(_) if call_deadline == deadline => {
                    SignalScore::Degraded(DegradedReason::DeadlineExceeded)
                }
                Err(_) => SignalScore::Degraded(DegradedReason::Timeout),
            };

            (slot, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => warn!(error = %err, "rerank task failed to join"),
        }
    }
    outcomes
}
