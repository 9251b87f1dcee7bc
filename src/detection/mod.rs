//! Context detection
//!
//! Turns a raw request (free text, changed files, optional work item) into a
//! structured, scored context:
//! - Multi-domain scoring from keyword, path and work item signals
//! - Persona lookup from the domain vector
//! - Complexity and risk estimation from fixed thresholds
//! - Confidence from the separation of the top domains

pub mod config;
pub mod detector;
pub mod models;
pub mod risk;
pub mod signals;

pub use self::config::{
    ComplexityConfig, ConfidenceConfig, DetectorConfig, DomainRule, PersonaRule, RiskConfig,
    RiskPoints, RiskThresholds,
};
pub use detector::{ContextDetector, DomainSignals};
pub use models::{
    ChangeKind, Complexity, Context, ContextMetadata, DomainScore, FileRef, Request, RiskFactor,
    RiskLevel, WorkItemRef,
};
pub use risk::{RiskAssessment, RiskAssessor};
