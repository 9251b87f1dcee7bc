//! Instruction engine: the request pipeline
//!
//! Request -> detect -> optimize -> select -> validate -> decide.
//! Stages never call back into earlier ones and the learning store is the
//! only state that outlives a request. Any internal fault, including a
//! panic inside a stage, yields the fallback execution context instead of an
//! error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogHandle, CatalogLoader, CatalogSource, InstructionEntry};
use crate::config::EngineConfig;
use crate::detection::{
    Complexity, Context, ContextDetector, ContextMetadata, Request, RiskLevel, RiskThresholds,
};
use crate::error::{EngineError, Result};
use crate::gate::{
    Decision, GateOutcome, LifecycleState, RequestLifecycle, RiskGate, WorkflowValidator,
};
use crate::learning::{LearningEngine, LearningRecord, LearningStore, OptimizedContext};
use crate::metrics::METRICS;
use crate::orchestration::{InstructionOrchestrator, InstructionSet, InstructionSetMetadata};
use crate::time_stage;

/// Pipeline output handed to downstream collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub request_id: Uuid,
    pub proceed: bool,
    pub outcome: GateOutcome,
    pub reason: String,
    pub context: OptimizedContext,
    /// Selected entry ids in priority order
    pub instructions: Vec<String>,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub mitigation: Option<Vec<String>>,
    pub risk_factors: Option<Vec<String>>,
    pub warnings: Vec<String>,
    /// Produced by the fault path rather than the pipeline
    pub fallback: bool,
    pub degraded: bool,
    pub truncated: bool,
    pub lifecycle: Vec<LifecycleState>,
    pub catalog_fingerprint: String,
    pub processed_at: DateTime<Utc>,
}

struct PipelineOutput {
    context: OptimizedContext,
    instructions: InstructionSet,
    decision: Decision,
    lifecycle: RequestLifecycle,
}

/// Wires the pipeline stages together
pub struct InstructionEngine {
    detector: ContextDetector,
    learning: LearningEngine,
    orchestrator: InstructionOrchestrator,
    validator: WorkflowValidator,
    gate: RiskGate,
    catalog: CatalogHandle,
    thresholds: RiskThresholds,
    fallback_context: Context,
}

impl InstructionEngine {
    pub fn new(config: EngineConfig, catalog: CatalogHandle, store: Arc<dyn LearningStore>) -> Self {
        let thresholds = config.risk.thresholds;
        let fallback_context = Context {
            domains: Vec::new(),
            primary_domain: config.detector.general_domain.clone(),
            secondary_domains: Vec::new(),
            persona: config.detector.default_persona.clone(),
            complexity: Complexity::Low,
            risk_level: RiskLevel::Medium,
            risk_score: thresholds.medium,
            confidence: config.confidence.floor,
            metadata: ContextMetadata {
                degraded_input: true,
                ..Default::default()
            },
        };

        Self {
            detector: ContextDetector::new(
                config.detector,
                config.complexity,
                config.risk,
                config.confidence,
            ),
            learning: LearningEngine::new(store, config.learning),
            orchestrator: InstructionOrchestrator::new(config.budget),
            validator: WorkflowValidator::new(config.gate.clone()),
            gate: RiskGate::new(config.gate, thresholds),
            catalog,
            thresholds,
            fallback_context,
        }
    }

    pub fn detector(&self) -> &ContextDetector {
        &self.detector
    }

    pub fn learning(&self) -> &LearningEngine {
        &self.learning
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    /// Replace the catalog from a new feed
    pub fn reload(&self, entries: Vec<InstructionEntry>) -> Arc<Catalog> {
        self.catalog.reload(entries)
    }

    /// Load a catalog from a source and swap it in
    pub async fn load_catalog(
        &self,
        loader: &CatalogLoader,
        source: &dyn CatalogSource,
    ) -> Result<Arc<Catalog>> {
        let catalog = loader.load(source).await?;
        Ok(self.catalog.install(catalog))
    }

    /// Process a request with the configured budget
    pub fn process(&self, request: &Request) -> ExecutionContext {
        self.process_with_budget(request, self.orchestrator.config().max_total)
    }

    /// Process a request under an explicit instruction budget
    pub fn process_with_budget(&self, request: &Request, budget: u32) -> ExecutionContext {
        let request_id = Uuid::new_v4();
        let span = info_span!("process", request_id = %request_id);
        let _enter = span.enter();

        let catalog = self.catalog.snapshot();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(request, &catalog, budget)));

        let (output, fallback) = match result {
            Ok(Ok(output)) => (output, false),
            Ok(Err(e)) => {
                warn!("Pipeline failed, using fallback context: {}", e);
                (self.fallback(&catalog, budget), true)
            }
            Err(_) => {
                error!("Pipeline panicked, using fallback context");
                (self.fallback(&catalog, budget), true)
            }
        };

        METRICS.record_request(output.decision.outcome.as_str(), fallback);
        info!(
            "Request processed: {} with {} instructions (fallback={})",
            output.decision.outcome,
            output.instructions.instructions.len(),
            fallback
        );

        let context = output.context.context.clone();
        ExecutionContext {
            request_id,
            proceed: output.decision.proceed,
            outcome: output.decision.outcome,
            reason: output.decision.reason,
            instructions: output.instructions.ids(),
            risk_level: context.risk_level,
            risk_score: context.risk_score,
            mitigation: output.decision.mitigation,
            risk_factors: output.decision.risk_factors,
            warnings: output.decision.warnings,
            fallback,
            degraded: output.instructions.metadata.degraded,
            truncated: output.instructions.metadata.truncated,
            lifecycle: output.lifecycle.history().to_vec(),
            catalog_fingerprint: catalog.fingerprint().to_string(),
            context: output.context,
            processed_at: Utc::now(),
        }
    }

    fn run(&self, request: &Request, catalog: &Catalog, budget: u32) -> Result<PipelineOutput> {
        let mut lifecycle = RequestLifecycle::new();

        let context = time_stage!("detect", self.detector.detect(request));
        context.check_invariants().map_err(EngineError::Invariant)?;

        let optimized = time_stage!("optimize", self.learning.optimize(&context));
        let effective = optimized.effective_context();

        let instructions = time_stage!("select", self.orchestrator.select(&effective, catalog, budget));
        if !instructions.respects_budget() {
            return Err(EngineError::Invariant(format!(
                "selection cost {} breaks budget {}",
                instructions.metadata.total_cost, budget
            )));
        }
        METRICS.record_selection(
            instructions.metadata.total_cost,
            instructions.metadata.truncated,
            instructions.metadata.degraded,
        );
        if instructions.metadata.degraded {
            warn!(
                "Core instructions exceed budget: {} > {}",
                instructions.metadata.total_cost, budget
            );
        }

        let validation = time_stage!("validate", self.validator.validate(request, &effective));
        let decision = if validation.compliant {
            lifecycle.transition(LifecycleState::Validated)?;
            lifecycle.transition(LifecycleState::RiskAssessed)?;
            let decision = time_stage!("decide", self.gate.decide(&effective, &instructions));
            lifecycle.transition(decision.outcome.into())?;
            decision
        } else {
            debug!("Workflow validation failed: {}", validation.reason);
            lifecycle.transition(LifecycleState::Stop)?;
            self.gate.reject(&effective, &instructions, &validation)
        };

        Ok(PipelineOutput {
            context: optimized,
            instructions,
            decision,
            lifecycle,
        })
    }

    /// Core instructions only, medium risk, proceed
    fn fallback(&self, catalog: &Catalog, budget: u32) -> PipelineOutput {
        let instructions: Vec<InstructionEntry> =
            catalog.core().map(|(_, entry)| entry.clone()).collect();
        let total_cost: u64 = instructions.iter().map(|e| u64::from(e.size_cost)).sum();
        let metadata = InstructionSetMetadata {
            degraded: total_cost > u64::from(budget),
            original_count: instructions.len(),
            total_cost,
            budget,
            priority: "normal".to_string(),
            ..Default::default()
        };

        let mut decision = Decision::proceed(format!(
            "internal fault: fallback at {} risk",
            RiskLevel::Medium
        ));
        decision.warnings.push("fallback context: core instructions only".to_string());

        let lifecycle = RequestLifecycle::replay(&[
            LifecycleState::Validated,
            LifecycleState::RiskAssessed,
            LifecycleState::Proceed,
        ])
        .unwrap_or_default();

        PipelineOutput {
            context: OptimizedContext::unchanged(self.fallback_context.clone()),
            instructions: InstructionSet {
                instructions,
                metadata,
            },
            decision,
            lifecycle,
        }
    }

    /// Feed an outcome back into the learning store
    pub fn record_outcome(&self, domain: &str, persona: &str, success: bool) -> Option<LearningRecord> {
        self.learning.record_outcome(domain, persona, success)
    }

    /// Feed back the outcome of a processed request
    pub fn record_execution(&self, execution: &ExecutionContext, success: bool) -> Option<LearningRecord> {
        if execution.fallback {
            debug!("Not learning from fallback request {}", execution.request_id);
            return None;
        }
        self.record_outcome(
            &execution.context.context.primary_domain,
            execution.context.effective_persona(),
            success,
        )
    }

    pub fn risk_thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InstructionType;
    use crate::detection::{ChangeKind, FileRef, WorkItemRef};
    use crate::learning::InMemoryLearningStore;

    fn catalog() -> Catalog {
        Catalog::build(
            vec![
                InstructionEntry::new("core-rules", "core/rules.md", InstructionType::Core, 400),
                InstructionEntry::new("sec-review", "personas/security.md", InstructionType::Persona, 600)
                    .with_tags(["security-reviewer"]),
                InstructionEntry::new("sec-domain", "domains/security.md", InstructionType::Domain, 900)
                    .with_tags(["security", "priority:high"]),
                InstructionEntry::new("dev-domain", "domains/dev.md", InstructionType::Domain, 700)
                    .with_tags(["development"]),
                InstructionEntry::new("docs-domain", "domains/docs.md", InstructionType::Domain, 300)
                    .with_tags(["documentation"]),
            ],
            None,
        )
    }

    fn engine() -> InstructionEngine {
        InstructionEngine::new(
            EngineConfig::default(),
            CatalogHandle::new(catalog()),
            Arc::new(InMemoryLearningStore::default()),
        )
    }

    #[test]
    fn test_sql_injection_without_work_item_stops() {
        let request = Request::new("fix sql injection in login handler")
            .with_file(FileRef::new("auth/login.py", ChangeKind::Modified));
        let execution = engine().process(&request);

        assert!(!execution.proceed);
        assert_eq!(execution.outcome, GateOutcome::Stop);
        assert!(execution.reason.contains("work item"));
        assert_eq!(execution.context.context.primary_domain, "security");
        assert_eq!(execution.lifecycle, vec![LifecycleState::Detected, LifecycleState::Stop]);
        assert!(!execution.fallback);
        assert_eq!(execution.instructions[0], "core-rules");
    }

    #[test]
    fn test_empty_request_proceeds_with_floor_confidence() {
        let execution = engine().process(&Request::default());
        assert!(execution.proceed);
        assert_eq!(execution.context.context.primary_domain, "general");
        assert_eq!(execution.context.context.confidence, 0.2);
        assert!(execution.context.context.metadata.degraded_input);
        assert_eq!(execution.instructions, vec!["core-rules"]);
        assert_eq!(execution.lifecycle.last(), Some(&LifecycleState::Proceed));
    }

    #[test]
    fn test_linked_security_work_is_not_stopped_for_linkage() {
        let request = Request::new("fix sql injection in login handler")
            .with_work_item(WorkItemRef::new("SEC-7").with_kind("bug"));
        let execution = engine().process(&request);
        assert!(!execution.reason.contains("linkage"));
        assert_eq!(execution.lifecycle[1], LifecycleState::Validated);
    }

    #[test]
    fn test_budget_override_truncates() {
        let request = Request::new("update the readme guide");
        let execution = engine().process_with_budget(&request, 500);
        assert_eq!(execution.instructions, vec!["core-rules"]);
        assert!(execution.truncated);
        assert!(!execution.warnings.is_empty());
    }

    #[test]
    fn test_core_overflow_reported_as_degraded() {
        let execution = engine().process_with_budget(&Request::new("update the readme"), 100);
        assert!(execution.degraded);
        assert!(execution.proceed);
        assert_eq!(execution.instructions, vec!["core-rules"]);
    }

    #[test]
    fn test_fallback_context_shape() {
        let engine = engine();
        let catalog = engine.catalog();
        let output = engine.fallback(&catalog, 8000);
        assert_eq!(output.context.context.risk_level, RiskLevel::Medium);
        assert_eq!(output.context.context.risk_score, 3.0);
        assert!(output.decision.proceed);
        assert_eq!(output.instructions.ids(), vec!["core-rules"]);
        assert_eq!(output.lifecycle.state(), LifecycleState::Proceed);
    }

    #[test]
    fn test_invariant_violation_produces_fallback() {
        // a non-finite floor leaks into the detected confidence
        let mut config = EngineConfig::default();
        config.confidence.floor = f64::NAN;
        let engine = InstructionEngine::new(
            config,
            CatalogHandle::new(catalog()),
            Arc::new(InMemoryLearningStore::default()),
        );
        let execution = engine.process(&Request::default());
        assert!(execution.fallback);
        assert!(execution.proceed);
        assert_eq!(execution.risk_level, RiskLevel::Medium);
        assert_eq!(execution.instructions, vec!["core-rules"]);
    }

    #[test]
    fn test_record_execution_feeds_learning() {
        let engine = engine();
        let execution = engine.process(&Request::new("update the readme"));
        let record = engine.record_execution(&execution, true).unwrap();
        assert_eq!(record.domain, "documentation");
        assert_eq!(record.persona, "technical-writer");
        assert_eq!(record.total_count, 1);
    }

    #[test]
    fn test_reload_changes_fingerprint() {
        let engine = engine();
        let before = engine.process(&Request::new("update the readme")).catalog_fingerprint;
        engine.reload(vec![InstructionEntry::new("only", "only.md", InstructionType::Core, 10)]);
        let after = engine.process(&Request::new("update the readme"));
        assert_ne!(before, after.catalog_fingerprint);
        assert_eq!(after.instructions, vec!["only"]);
    }

    #[test]
    fn test_execution_context_serializes() {
        let execution = engine().process(&Request::new("update the readme"));
        let json = serde_json::to_value(&execution).unwrap();
        assert_eq!(json["outcome"], "proceed");
        assert_eq!(json["risk_level"], "low");
    }
}
