//! Risk decision rules
//!
//! Rules are evaluated in a fixed order and the first match decides:
//! 1. Traceability domain without a linked work item stops
//! 2. Critical risk stops for human review
//! 3. High risk with low confidence stops
//! 4. High complexity at medium risk or above proceeds with mitigation
//! 5. Everything else proceeds

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::workflow::ValidationResult;
use super::GateConfig;
use crate::detection::{Complexity, Context, RiskThresholds};
use crate::orchestration::InstructionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Proceed,
    ProceedWithMitigation,
    Stop,
}

impl GateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateOutcome::Proceed => "proceed",
            GateOutcome::ProceedWithMitigation => "proceed_with_mitigation",
            GateOutcome::Stop => "stop",
        }
    }

    pub fn proceeds(&self) -> bool {
        !matches!(self, GateOutcome::Stop)
    }
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub proceed: bool,
    pub outcome: GateOutcome,
    pub reason: String,
    pub mitigation: Option<Vec<String>>,
    pub risk_factors: Option<Vec<String>>,
    /// Informational, never changes the outcome
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Decision {
    pub fn proceed(reason: impl Into<String>) -> Self {
        Self {
            proceed: true,
            outcome: GateOutcome::Proceed,
            reason: reason.into(),
            mitigation: None,
            risk_factors: None,
            warnings: Vec::new(),
        }
    }

    pub fn mitigate(reason: impl Into<String>, checklist: Vec<String>) -> Self {
        Self {
            proceed: true,
            outcome: GateOutcome::ProceedWithMitigation,
            reason: reason.into(),
            mitigation: Some(checklist),
            risk_factors: None,
            warnings: Vec::new(),
        }
    }

    pub fn stop(reason: impl Into<String>, risk_factors: Vec<String>) -> Self {
        Self {
            proceed: false,
            outcome: GateOutcome::Stop,
            reason: reason.into(),
            mitigation: None,
            risk_factors: Some(risk_factors),
            warnings: Vec::new(),
        }
    }
}

/// Risk gate
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: GateConfig,
    thresholds: RiskThresholds,
}

impl RiskGate {
    pub fn new(config: GateConfig, thresholds: RiskThresholds) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn decide(&self, context: &Context, instructions: &InstructionSet) -> Decision {
        let mut decision = self.evaluate(context);
        decision.warnings = selection_warnings(instructions);

        info!(
            "Gate decision: {} ({}) risk={:.1} confidence={:.2}",
            decision.outcome, decision.reason, context.risk_score, context.confidence
        );
        decision
    }

    /// Stop for a failed workflow validation, skipping the risk rules
    pub fn reject(
        &self,
        context: &Context,
        instructions: &InstructionSet,
        validation: &ValidationResult,
    ) -> Decision {
        let mut decision =
            Decision::stop(validation.reason.clone(), context.metadata.risk_factor_names());
        decision.warnings = selection_warnings(instructions);
        info!("Gate decision: {} ({})", decision.outcome, decision.reason);
        decision
    }

    fn evaluate(&self, context: &Context) -> Decision {
        let factors = context.metadata.risk_factor_names();

        if self.config.requires_traceability(&context.primary_domain)
            && !context.metadata.has_work_item
        {
            debug!("Rule 1: {} work without work item", context.primary_domain);
            return Decision::stop("missing required linkage: work item", factors);
        }

        if context.risk_score >= self.thresholds.critical {
            debug!("Rule 2: risk {:.1} at or above critical", context.risk_score);
            return Decision::stop("requires human review", factors);
        }

        if context.risk_score >= self.thresholds.high
            && context.confidence < self.config.confidence_floor
        {
            debug!(
                "Rule 3: risk {:.1} with confidence {:.2}",
                context.risk_score, context.confidence
            );
            return Decision::stop("high risk with low certainty", factors);
        }

        if context.complexity == Complexity::High && context.risk_score >= self.thresholds.medium {
            debug!("Rule 4: high complexity at risk {:.1}", context.risk_score);
            return Decision::mitigate(
                "high complexity with elevated risk",
                self.config.mitigation_checklist.clone(),
            );
        }

        Decision::proceed("within policy")
    }
}

fn selection_warnings(instructions: &InstructionSet) -> Vec<String> {
    let metadata = &instructions.metadata;
    let mut warnings = Vec::new();
    if metadata.degraded {
        warnings.push(format!(
            "core instructions exceed budget: {} > {}",
            metadata.total_cost, metadata.budget
        ));
    }
    if metadata.truncated {
        warnings.push(format!(
            "{} instruction(s) omitted for budget: {}",
            metadata.skipped.len(),
            metadata.skipped.join(", ")
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ContextMetadata, DomainScore, RiskFactor, RiskLevel};
    use crate::orchestration::InstructionSetMetadata;

    fn context(domain: &str, risk_score: f64, confidence: f64, complexity: Complexity) -> Context {
        let thresholds = RiskThresholds::default();
        let mut metadata = ContextMetadata::default();
        metadata.risk_factors.insert(RiskFactor::ProductionPath);
        Context {
            domains: vec![DomainScore {
                domain: domain.to_string(),
                score: 1.0,
            }],
            primary_domain: domain.to_string(),
            secondary_domains: vec![],
            persona: "generalist".to_string(),
            complexity,
            risk_level: thresholds.level(risk_score),
            risk_score,
            confidence,
            metadata,
        }
    }

    fn gate() -> RiskGate {
        RiskGate::new(GateConfig::default(), RiskThresholds::default())
    }

    #[test]
    fn test_missing_work_item_stops_at_zero_risk() {
        let decision = gate().decide(
            &context("security", 0.0, 1.0, Complexity::Low),
            &InstructionSet::default(),
        );
        assert!(!decision.proceed);
        assert_eq!(decision.outcome, GateOutcome::Stop);
        assert!(decision.reason.contains("work item"));
        assert_eq!(decision.risk_factors, Some(vec!["production_path".to_string()]));
    }

    #[test]
    fn test_critical_risk_stops() {
        let decision = gate().decide(
            &context("documentation", 8.0, 1.0, Complexity::Low),
            &InstructionSet::default(),
        );
        assert_eq!(decision.outcome, GateOutcome::Stop);
        assert_eq!(decision.reason, "requires human review");
    }

    #[test]
    fn test_high_risk_low_confidence_stops() {
        let gate = gate();
        let stop = gate.decide(
            &context("documentation", 6.5, 0.4, Complexity::Low),
            &InstructionSet::default(),
        );
        assert_eq!(stop.reason, "high risk with low certainty");

        let go = gate.decide(
            &context("documentation", 6.5, 0.8, Complexity::Low),
            &InstructionSet::default(),
        );
        assert_eq!(go.outcome, GateOutcome::Proceed);
    }

    #[test]
    fn test_high_complexity_gets_checklist() {
        let decision = gate().decide(
            &context("documentation", 3.0, 0.9, Complexity::High),
            &InstructionSet::default(),
        );
        assert_eq!(decision.outcome, GateOutcome::ProceedWithMitigation);
        assert!(decision.proceed);
        assert_eq!(decision.mitigation, Some(GateConfig::default().mitigation_checklist));
    }

    #[test]
    fn test_rule_order_is_respected() {
        // critical risk, low confidence and high complexity all match; rule 2 wins
        let decision = gate().decide(
            &context("documentation", 9.0, 0.1, Complexity::High),
            &InstructionSet::default(),
        );
        assert_eq!(decision.reason, "requires human review");
        assert_eq!(context("documentation", 9.0, 0.1, Complexity::High).risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_selection_warnings_do_not_change_outcome() {
        let instructions = InstructionSet {
            instructions: vec![],
            metadata: InstructionSetMetadata {
                truncated: true,
                degraded: true,
                total_cost: 900,
                budget: 500,
                skipped: vec!["sec-1".to_string()],
                ..Default::default()
            },
        };
        let decision = gate().decide(&context("documentation", 0.0, 1.0, Complexity::Low), &instructions);
        assert_eq!(decision.outcome, GateOutcome::Proceed);
        assert_eq!(decision.warnings.len(), 2);
        assert!(decision.warnings[1].contains("sec-1"));
    }
}
