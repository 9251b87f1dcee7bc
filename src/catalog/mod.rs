//! Instruction catalog
//!
//! The catalog is external, read-only content. The engine only indexes it and
//! selects from it:
//! - Feeds arrive through a [`CatalogSource`] or a direct `reload`
//! - Inconsistent entries are logged and excluded, never fatal
//! - Lookups go through an inverted tag index

pub mod handle;
pub mod index;
pub mod models;
pub mod size_estimator;
pub mod source;

pub use handle::CatalogHandle;
pub use index::Catalog;
pub use models::{CatalogRecord, ExcludedEntry, InstructionEntry, InstructionType};
pub use size_estimator::{estimator_for, SizeEstimator, TiktokenEstimator, WordBasedEstimator};
pub use source::{CatalogLoader, CatalogSource, FileCatalogSource, StaticCatalogSource};

use std::path::PathBuf;
use thiserror::Error;

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Size estimator unavailable: {0}")]
    Estimator(String),

    #[error("Catalog source error: {0}")]
    Source(String),
}
