//! Context-aware instruction orchestration
//!
//! For each development request the engine decides which slice of a large
//! instruction catalog applies, which persona and risk posture fit, and
//! whether the work may proceed, proceed with mitigation, or must stop for
//! human review. All of it happens under a fixed instruction budget.
//!
//! ```no_run
//! use context_orchestrator::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = context_orchestrator::init_engine(EngineConfig::load(None)?).await?;
//! let execution = engine.process(&Request::new("fix sql injection in login handler"));
//! if !execution.proceed {
//!     println!("stopped: {}", execution.reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod gate;
pub mod learning;
pub mod metrics;
pub mod orchestration;
pub mod telemetry;

pub use crate::config::{CatalogConfig, EngineConfig};
pub use engine::{ExecutionContext, InstructionEngine};
pub use error::{EngineError, Result};

use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use catalog::{estimator_for, CatalogHandle, CatalogLoader, FileCatalogSource};
use learning::InMemoryLearningStore;

/// Commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, InstructionEntry, InstructionType};
    pub use crate::config::EngineConfig;
    pub use crate::detection::{ChangeKind, Context, FileRef, Request, RiskLevel, WorkItemRef};
    pub use crate::engine::{ExecutionContext, InstructionEngine};
    pub use crate::gate::{Decision, GateOutcome};
    pub use crate::learning::{LearningStore, OptimizedContext};
    pub use crate::orchestration::InstructionSet;
}

/// Build an engine from configuration
///
/// Loads the catalog file and learning snapshot when configured. A missing
/// snapshot file is not an error; an unreadable catalog is.
pub async fn init_engine(config: EngineConfig) -> anyhow::Result<InstructionEngine> {
    config.validate().context("Invalid engine configuration")?;
    telemetry::init_tracing(&config.logging);

    let content_root = config.catalog.content_root.as_ref().map(PathBuf::from);
    let handle = match &content_root {
        Some(root) if config.catalog.verify_paths => CatalogHandle::empty().with_content_root(root),
        _ => CatalogHandle::empty(),
    };

    let store = Arc::new(InMemoryLearningStore::new(config.learning.max_retries));
    if let Some(path) = &config.learning.snapshot_path {
        let path = Path::new(path);
        if path.exists() {
            store
                .load_snapshot(path)
                .await
                .with_context(|| format!("Failed to load learning snapshot {}", path.display()))?;
        } else {
            info!("No learning snapshot at {}, starting cold", path.display());
        }
    }

    let source_path = config.catalog.source_path.clone();
    let estimator = estimator_for(&config.catalog.estimator)
        .context("Failed to initialize size estimator")?;
    let loader = CatalogLoader::new(estimator, content_root, config.catalog.verify_paths);

    let engine = InstructionEngine::new(config, handle, store);

    if let Some(path) = source_path {
        let catalog = engine
            .load_catalog(&loader, &FileCatalogSource::new(&path))
            .await
            .with_context(|| format!("Failed to load catalog from {}", path))?;
        info!("Engine ready with {} catalog entries", catalog.len());
    } else {
        info!("Engine ready with an empty catalog");
    }

    Ok(engine)
}
