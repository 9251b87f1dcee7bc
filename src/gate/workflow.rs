//! Workflow compliance checks

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GateConfig;
use crate::detection::{Context, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    MissingWorkItem,
    InvalidWorkItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub compliant: bool,
    pub reason: String,
    pub violation: Option<Violation>,
}

impl ValidationResult {
    fn compliant() -> Self {
        Self {
            compliant: true,
            reason: "workflow compliant".to_string(),
            violation: None,
        }
    }

    fn violated(violation: Violation, reason: impl Into<String>) -> Self {
        Self {
            compliant: false,
            reason: reason.into(),
            violation: Some(violation),
        }
    }
}

/// Checks work-item linkage for traceability domains
#[derive(Debug, Clone)]
pub struct WorkflowValidator {
    config: GateConfig,
}

impl WorkflowValidator {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, request: &Request, context: &Context) -> ValidationResult {
        if !self.config.requires_traceability(&context.primary_domain) {
            return ValidationResult::compliant();
        }

        let result = match &request.work_item {
            None => ValidationResult::violated(
                Violation::MissingWorkItem,
                format!(
                    "missing required linkage: work item for {} work",
                    context.primary_domain
                ),
            ),
            Some(item) if !item.is_linked() || item.key.trim().contains(char::is_whitespace) => {
                ValidationResult::violated(
                    Violation::InvalidWorkItem,
                    format!("missing required linkage: invalid work item key '{}'", item.key),
                )
            }
            Some(_) => ValidationResult::compliant(),
        };
        debug!("Workflow validation: {}", result.reason);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ContextDetector, WorkItemRef};

    fn validate(request: &Request) -> ValidationResult {
        let context = ContextDetector::with_defaults().detect(request);
        WorkflowValidator::new(GateConfig::default()).validate(request, &context)
    }

    #[test]
    fn test_security_work_needs_work_item() {
        let result = validate(&Request::new("fix sql injection in login handler"));
        assert!(!result.compliant);
        assert_eq!(result.violation, Some(Violation::MissingWorkItem));
        assert!(result.reason.contains("work item"));
    }

    #[test]
    fn test_linked_work_item_is_compliant() {
        let request = Request::new("fix sql injection in login handler")
            .with_work_item(WorkItemRef::new("SEC-42"));
        assert!(validate(&request).compliant);
    }

    #[test]
    fn test_malformed_key_is_invalid() {
        let request = Request::new("fix sql injection in login handler")
            .with_work_item(WorkItemRef::new("SEC 42"));
        assert_eq!(validate(&request).violation, Some(Violation::InvalidWorkItem));
    }

    #[test]
    fn test_documentation_needs_no_linkage() {
        assert!(validate(&Request::new("update the readme")).compliant);
    }
}
