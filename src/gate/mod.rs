//! Workflow and risk gate
//!
//! Final deterministic policy step of the pipeline. A stop is a decision
//! returned to the caller, not an error.

pub mod lifecycle;
pub mod risk_gate;
pub mod workflow;

pub use lifecycle::{LifecycleError, LifecycleState, RequestLifecycle};
pub use risk_gate::{Decision, GateOutcome, RiskGate};
pub use workflow::{ValidationResult, Violation, WorkflowValidator};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Domains whose work must be linked to a work item
    #[serde(default = "default_traceability_domains")]
    pub traceability_domains: Vec<String>,

    /// High-risk requests below this confidence are stopped
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Attached to proceed-with-mitigation decisions
    #[serde(default = "default_mitigation_checklist")]
    pub mitigation_checklist: Vec<String>,
}

fn default_traceability_domains() -> Vec<String> {
    ["security", "development", "infrastructure", "database"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_confidence_floor() -> f64 {
    0.5
}

fn default_mitigation_checklist() -> Vec<String> {
    [
        "Split the change into independently reviewable parts",
        "Add or update tests covering every changed path",
        "Request review from a domain owner",
        "Prepare a rollback plan before deployment",
        "Monitor error rates after release",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            traceability_domains: default_traceability_domains(),
            confidence_floor: default_confidence_floor(),
            mitigation_checklist: default_mitigation_checklist(),
        }
    }
}

impl GateConfig {
    pub fn requires_traceability(&self, domain: &str) -> bool {
        self.traceability_domains.iter().any(|d| d == domain)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(EngineError::Configuration(format!(
                "gate.confidence_floor must be within [0, 1], got {}",
                self.confidence_floor
            )));
        }
        if self.mitigation_checklist.is_empty() {
            return Err(EngineError::Configuration(
                "gate.mitigation_checklist must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
