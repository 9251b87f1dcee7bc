//! Learning feedback loop
//!
//! Historical effectiveness per (domain, persona), fed by explicit outcome
//! events and read when contexts are optimized.

pub mod engine;
pub mod models;
pub mod store;

pub use engine::{LearningConfig, LearningEngine};
pub use models::{LearningRecord, OptimizedContext, Recommendation, RecommendationKind};
pub use store::{InMemoryLearningStore, LearningSnapshot, LearningStore};

use std::path::PathBuf;
use thiserror::Error;

/// Learning store errors
#[derive(Debug, Error)]
pub enum LearningError {
    #[error("Record ({domain}, {persona}) still busy after {attempts} attempts")]
    Contention {
        domain: String,
        persona: String,
        attempts: u32,
    },

    #[error("Snapshot IO error at {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}
