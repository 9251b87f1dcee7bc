//! Instruction orchestration
//!
//! Selects the minimal sufficient slice of the catalog for a context under a
//! size budget.

pub mod budget;
pub mod instruction_set;
pub mod selector;

pub use budget::{BudgetConfig, BudgetError, InstructionBudget};
pub use instruction_set::{InstructionSet, InstructionSetMetadata};
pub use selector::InstructionOrchestrator;
