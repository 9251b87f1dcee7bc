//! Engine configuration
//!
//! Every section has serde defaults, so an empty file (or none at all) yields
//! the shipped configuration. Values are layered: defaults, then an optional
//! file, then `ORCHESTRATOR__<SECTION>__<KEY>` environment variables.

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::detection::{ComplexityConfig, ConfidenceConfig, DetectorConfig, RiskConfig};
use crate::error::{EngineError, Result};
use crate::gate::GateConfig;
use crate::learning::LearningConfig;
use crate::orchestration::BudgetConfig;
use crate::telemetry::LoggingConfig;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "ORCHESTRATOR";

/// Catalog loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with the catalog records
    #[serde(default)]
    pub source_path: Option<String>,

    /// Directory entry paths are relative to
    #[serde(default)]
    pub content_root: Option<String>,

    /// Exclude entries whose file is missing under `content_root`
    #[serde(default)]
    pub verify_paths: bool,

    /// Estimator for entries without a size cost (tiktoken, words)
    #[serde(default = "default_estimator")]
    pub estimator: String,
}

fn default_estimator() -> String {
    "words".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            content_root: None,
            verify_paths: false,
            estimator: default_estimator(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub complexity: ComplexityConfig,

    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load defaults, an optional file and environment overrides, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.risk.validate()?;
        self.confidence.validate()?;
        self.budget.validate()?;
        self.learning.validate()?;
        self.gate.validate()?;

        if self.catalog.verify_paths && self.catalog.content_root.is_none() {
            return Err(EngineError::Configuration(
                "catalog.verify_paths requires catalog.content_root".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.budget.max_total, 8000);
        assert_eq!(config.learning.min_samples, 5);
        assert_eq!(config.catalog.estimator, "words");
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = EngineConfig::default();
        config.budget.max_total = 0;
        assert!(matches!(config.validate(), Err(EngineError::Budget(_))));
    }

    #[test]
    fn test_verify_paths_needs_root() {
        let mut config = EngineConfig::default();
        config.catalog.verify_paths = true;
        assert!(config.validate().is_err());
        config.catalog.content_root = Some("/srv/instructions".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"budget": {"max_total": 1200}, "gate": {"confidence_floor": 0.6}}"#)
                .unwrap();
        assert_eq!(config.budget.max_total, 1200);
        assert_eq!(config.gate.confidence_floor, 0.6);
        assert_eq!(config.detector.domains.len(), 6);
        assert_eq!(config.risk.thresholds.critical, 8.0);
    }
}
