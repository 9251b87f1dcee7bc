//! Error types for the orchestration engine

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::gate::LifecycleError;
use crate::learning::LearningError;
use crate::orchestration::BudgetError;

/// Result type used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level engine error
///
/// None of these ever reach the caller of [`crate::InstructionEngine::process`]:
/// the pipeline converts them into a fallback execution context.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Learning store error: {0}")]
    Learning(#[from] LearningError),

    #[error("Budget error: {0}")]
    Budget(#[from] BudgetError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<::config::ConfigError> for EngineError {
    fn from(err: ::config::ConfigError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}
