//! Learning data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::Context;

/// Effectiveness statistics for one (domain, persona) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub domain: String,
    pub persona: String,
    pub success_count: u64,
    pub total_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl LearningRecord {
    pub fn new(domain: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            persona: persona.into(),
            success_count: 0,
            total_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Apply one outcome
    pub fn record(&mut self, success: bool) {
        self.total_count += 1;
        if success {
            self.success_count += 1;
        }
        self.last_updated = Utc::now();
    }

    pub fn success_ratio(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_count as f64
    }

    /// Enough observations to act on
    pub fn is_trusted(&self, min_samples: u64) -> bool {
        self.total_count >= min_samples
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Prefer,
    Avoid,
}

/// Historical hint for a persona in a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub domain: String,
    pub persona: String,
    pub success_rate: f64,
    pub samples: u64,
}

/// Detected context plus learning adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedContext {
    pub context: Context,
    pub suggested_persona: Option<String>,
    pub persona_confidence: Option<f64>,
    pub pattern_recommendations: Vec<Recommendation>,
}

impl OptimizedContext {
    /// Context passed through unchanged
    pub fn unchanged(context: Context) -> Self {
        Self {
            context,
            suggested_persona: None,
            persona_confidence: None,
            pattern_recommendations: Vec::new(),
        }
    }

    /// Persona the rest of the pipeline should use
    pub fn effective_persona(&self) -> &str {
        self.suggested_persona
            .as_deref()
            .unwrap_or(&self.context.persona)
    }

    /// Derived context carrying the effective persona
    pub fn effective_context(&self) -> Context {
        match &self.suggested_persona {
            Some(persona) => self.context.with_persona(persona.clone()),
            None => self.context.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_ratio() {
        let mut record = LearningRecord::new("security", "security-reviewer");
        assert_eq!(record.success_ratio(), 0.0);
        record.record(true);
        record.record(true);
        record.record(false);
        record.record(true);
        assert_eq!(record.total_count, 4);
        assert_eq!(record.success_count, 3);
        assert!((record.success_ratio() - 0.75).abs() < f64::EPSILON);
        assert!(!record.is_trusted(5));
        record.record(false);
        assert!(record.is_trusted(5));
    }
}
