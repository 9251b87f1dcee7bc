//! Budget-constrained instruction selection
//!
//! Greedy by priority rather than an exact knapsack: the result is
//! deterministic and each inclusion or omission is explainable.
//! - Core entries are always reserved first
//! - Candidates: persona > primary domain > secondary domains > risk
//! - Risk-type entries are only eligible through the risk tier
//! - Entries that overflow are skipped, never partially included

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::budget::{BudgetConfig, InstructionBudget};
use super::instruction_set::{InstructionSet, InstructionSetMetadata};
use crate::catalog::{Catalog, InstructionType};
use crate::detection::{Context, RiskLevel};

const DEFAULT_PRIORITY: &str = "normal";

/// Instruction orchestrator
#[derive(Debug, Clone, Default)]
pub struct InstructionOrchestrator {
    config: BudgetConfig,
}

impl InstructionOrchestrator {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Select with the configured default budget
    pub fn select_default(&self, context: &Context, catalog: &Catalog) -> InstructionSet {
        self.select(context, catalog, self.config.max_total)
    }

    /// Select a minimal sufficient instruction set under `budget`
    pub fn select(&self, context: &Context, catalog: &Catalog, budget: u32) -> InstructionSet {
        let mut running = InstructionBudget::new(budget);
        let mut instructions = Vec::new();

        for (_, entry) in catalog.core() {
            running.reserve_mandatory(entry.size_cost);
            instructions.push(entry.clone());
        }
        let core_count = instructions.len();
        let degraded = running.is_exceeded();
        if degraded {
            warn!(
                "Core instructions alone exceed budget: {} > {}",
                running.used(),
                budget
            );
        }

        let candidates = self.candidates(context, catalog);
        let mut skipped = Vec::new();
        for (tier, position) in &candidates {
            let Some(entry) = catalog.entry(*position) else {
                continue;
            };
            match running.try_reserve(entry.size_cost) {
                Ok(()) => instructions.push(entry.clone()),
                Err(e) => {
                    debug!("Skipping '{}' (tier {}): {}", entry.id, tier, e);
                    skipped.push(entry.id.clone());
                }
            }
        }

        let metadata = InstructionSetMetadata {
            truncated: !skipped.is_empty(),
            degraded,
            original_count: core_count + candidates.len(),
            total_cost: running.used(),
            budget,
            skipped,
            techniques: collect_tag_values(&instructions, "technique"),
            expertise: collect_tag_values(&instructions, "expertise"),
            priority: highest_priority(&instructions),
        };

        debug!(
            "Selected {} of {} eligible instructions (cost {}/{}, truncated={}, degraded={})",
            instructions.len(),
            metadata.original_count,
            metadata.total_cost,
            budget,
            metadata.truncated,
            metadata.degraded
        );

        InstructionSet {
            instructions,
            metadata,
        }
    }

    /// Non-core candidates as (tier, catalog position), best first
    fn candidates(&self, context: &Context, catalog: &Catalog) -> Vec<(usize, usize)> {
        let mut tiers: Vec<Vec<&str>> = Vec::new();
        tiers.push(vec![context.persona.as_str()]);
        tiers.push(vec![context.primary_domain.as_str()]);
        for secondary in &context.secondary_domains {
            tiers.push(vec![secondary.as_str()]);
        }
        let risk_tier = tiers.len();
        let elevated = context.risk_level.is_elevated();
        if elevated {
            let mut risk_tags = vec!["risk", context.risk_level.as_str()];
            if context.risk_level == RiskLevel::Critical {
                risk_tags.push(RiskLevel::High.as_str());
            }
            tiers.push(risk_tags);
        }

        let mut best: HashMap<usize, usize> = HashMap::new();
        let mut offer = |position: usize, tier: usize| {
            best.entry(position)
                .and_modify(|t| *t = (*t).min(tier))
                .or_insert(tier);
        };
        for (tier, tags) in tiers.iter().enumerate() {
            for tag in tags {
                for &position in catalog.tagged(tag) {
                    let Some(entry) = catalog.entry(position) else {
                        continue;
                    };
                    let eligible = match entry.kind {
                        InstructionType::Core => false,
                        InstructionType::Risk => elevated,
                        _ => true,
                    };
                    if eligible {
                        offer(position, tier);
                    }
                }
            }
        }
        if elevated {
            for &position in catalog.of_kind(InstructionType::Risk) {
                offer(position, risk_tier);
            }
        }

        let mut ordered: Vec<(usize, usize)> = best
            .into_iter()
            .map(|(position, tier)| (tier, position))
            .collect();
        ordered.sort_unstable();
        ordered
    }
}

fn collect_tag_values(entries: &[crate::catalog::InstructionEntry], prefix: &str) -> Vec<String> {
    entries
        .iter()
        .flat_map(|e| e.tag_values(prefix))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn priority_rank(priority: &str) -> Option<u8> {
    match priority {
        "low" => Some(0),
        "medium" => Some(1),
        "high" => Some(2),
        "critical" => Some(3),
        _ => None,
    }
}

fn highest_priority(entries: &[crate::catalog::InstructionEntry]) -> String {
    entries
        .iter()
        .flat_map(|e| e.tag_values("priority"))
        .filter_map(|p| priority_rank(p).map(|rank| (rank, p)))
        .max()
        .map(|(_, p)| p.to_string())
        .unwrap_or_else(|| DEFAULT_PRIORITY.to_string())
}
