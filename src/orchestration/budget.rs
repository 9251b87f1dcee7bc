//! Instruction size budget
//!
//! Core entries are reserved unconditionally; everything else must fit in
//! what remains. Overrunning the budget with core entries alone is allowed
//! and reported as degraded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Budget used when the caller does not pass one
    #[serde(default = "default_max_total")]
    pub max_total: u32,
}

fn default_max_total() -> u32 {
    8000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_total: default_max_total(),
        }
    }
}

impl BudgetConfig {
    /// Validate that the budget configuration is usable
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.max_total == 0 {
            return Err(BudgetError::InvalidBudget(self.max_total));
        }
        Ok(())
    }
}

/// Budget errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("Invalid budget: {0}")]
    InvalidBudget(u32),

    #[error("Insufficient budget: need {needed}, have {available}")]
    InsufficientBudget { needed: u32, available: u32 },
}

/// Running budget for one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionBudget {
    limit: u32,
    used: u64,
}

impl InstructionBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Reserve mandatory content, even past the limit
    pub fn reserve_mandatory(&mut self, cost: u32) {
        self.used += u64::from(cost);
    }

    /// Reserve optional content only if it fits
    pub fn try_reserve(&mut self, cost: u32) -> Result<(), BudgetError> {
        let available = self.remaining();
        if cost > available {
            return Err(BudgetError::InsufficientBudget {
                needed: cost,
                available,
            });
        }
        self.used += u64::from(cost);
        Ok(())
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        let remaining = u64::from(self.limit).saturating_sub(self.used);
        u32::try_from(remaining).unwrap_or(u32::MAX)
    }

    pub fn is_exceeded(&self) -> bool {
        self.used > u64::from(self.limit)
    }
}
