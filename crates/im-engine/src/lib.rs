pub mod config;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod matching;
pub mod rerank;
pub mod run_id;
pub mod skill_normalizer;
pub mod text_builder;

use serde::{Deserialize, Serialize};

/// Version stamped into every ranked result set (`meta.engine_version`).
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Read-only snapshots handed in per request by the surrounding CRUD layer.
// The engine never mutates or persists them.

/// An internship posting as the engine sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remote: bool,
    /// Minimum academic year, if the employer set one.
    #[serde(default)]
    pub min_year: Option<i32>,
}

/// A student profile as the engine sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Free-text resume objective / summary.
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}
