//! Selected instruction set

use serde::{Deserialize, Serialize};

use crate::catalog::InstructionEntry;

/// Selection metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSetMetadata {
    /// At least one eligible candidate was skipped for budget
    pub truncated: bool,
    /// Core entries alone exceed the budget
    pub degraded: bool,
    /// Eligible entries (core and candidates) before budgeting
    pub original_count: usize,
    pub total_cost: u64,
    pub budget: u32,
    /// Ids of eligible candidates left out
    pub skipped: Vec<String>,
    pub techniques: Vec<String>,
    pub expertise: Vec<String>,
    pub priority: String,
}

/// Instructions selected for one request, in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSet {
    pub instructions: Vec<InstructionEntry>,
    pub metadata: InstructionSetMetadata,
}

impl InstructionSet {
    pub fn ids(&self) -> Vec<String> {
        self.instructions.iter().map(|e| e.id.clone()).collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.instructions.iter().map(|e| e.path.clone()).collect()
    }

    pub fn core_cost(&self) -> u64 {
        self.instructions
            .iter()
            .filter(|e| e.is_core())
            .map(|e| u64::from(e.size_cost))
            .sum()
    }

    /// Budget invariant: within budget, or over it only through core entries
    pub fn respects_budget(&self) -> bool {
        let budget = u64::from(self.metadata.budget);
        if self.metadata.degraded {
            self.core_cost() > budget && self.metadata.total_cost == self.core_cost()
        } else {
            self.metadata.total_cost <= budget
        }
    }
}
