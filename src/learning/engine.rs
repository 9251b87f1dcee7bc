//! Learning engine: persona adjustment and pattern recommendations

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::{LearningRecord, OptimizedContext, Recommendation, RecommendationKind};
use super::store::LearningStore;
use crate::detection::Context;
use crate::error::{EngineError, Result};
use crate::metrics::METRICS;

/// Learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Observations required before a record is trusted
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,

    /// Ratio lead another persona needs over the detected one
    #[serde(default = "default_persona_margin")]
    pub persona_margin: f64,

    #[serde(default = "default_prefer_ratio")]
    pub prefer_ratio: f64,

    #[serde(default = "default_avoid_ratio")]
    pub avoid_ratio: f64,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    /// Attempts to take a record's lock before an outcome is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Snapshot file loaded at startup, if present
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

fn default_min_samples() -> u64 {
    5
}

fn default_persona_margin() -> f64 {
    0.15
}

fn default_prefer_ratio() -> f64 {
    0.75
}

fn default_avoid_ratio() -> f64 {
    0.4
}

fn default_max_recommendations() -> usize {
    3
}

pub(crate) fn default_max_retries() -> u32 {
    16
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            persona_margin: default_persona_margin(),
            prefer_ratio: default_prefer_ratio(),
            avoid_ratio: default_avoid_ratio(),
            max_recommendations: default_max_recommendations(),
            max_retries: default_max_retries(),
            snapshot_path: None,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("persona_margin", self.persona_margin),
            ("prefer_ratio", self.prefer_ratio),
            ("avoid_ratio", self.avoid_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Configuration(format!(
                    "learning.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.avoid_ratio >= self.prefer_ratio {
            return Err(EngineError::Configuration(format!(
                "learning.avoid_ratio ({}) must be below prefer_ratio ({})",
                self.avoid_ratio, self.prefer_ratio
            )));
        }
        if self.max_retries == 0 {
            return Err(EngineError::Configuration(
                "learning.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Learning engine over an injectable store
pub struct LearningEngine {
    store: Arc<dyn LearningStore>,
    config: LearningConfig,
}

impl LearningEngine {
    pub fn new(store: Arc<dyn LearningStore>, config: LearningConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn LearningStore> {
        &self.store
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Adjust a detected context with historical effectiveness
    ///
    /// Under-sampled records never change the persona.
    pub fn optimize(&self, context: &Context) -> OptimizedContext {
        let records: Vec<LearningRecord> = self
            .store
            .records_for_domain(&context.primary_domain)
            .into_iter()
            .filter(|r| r.is_trusted(self.config.min_samples))
            .collect();

        if records.is_empty() {
            debug!(
                "No trusted learning records for domain '{}'",
                context.primary_domain
            );
            return OptimizedContext::unchanged(context.clone());
        }

        let mut optimized = OptimizedContext::unchanged(context.clone());
        if let Some(stronger) = self.stronger_persona(&context.persona, &records) {
            info!(
                "Learning suggests persona '{}' over '{}' for domain '{}' ({:.2})",
                stronger.persona,
                context.persona,
                context.primary_domain,
                stronger.success_ratio()
            );
            optimized.suggested_persona = Some(stronger.persona.clone());
            optimized.persona_confidence = Some(stronger.success_ratio());
        }
        optimized.pattern_recommendations = self.recommendations(&records);
        optimized
    }

    /// Trusted persona beating the detected one by more than the margin
    fn stronger_persona<'a>(
        &self,
        persona: &str,
        trusted: &'a [LearningRecord],
    ) -> Option<&'a LearningRecord> {
        let own = trusted.iter().find(|r| r.persona == persona)?;
        let best = trusted
            .iter()
            .filter(|r| r.persona != persona)
            .fold(None::<&LearningRecord>, |best, r| match best {
                Some(b) if b.success_ratio() >= r.success_ratio() => Some(b),
                _ => Some(r),
            })?;

        (best.success_ratio() - own.success_ratio() > self.config.persona_margin).then_some(best)
    }

    fn recommendations(&self, trusted: &[LearningRecord]) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = trusted
            .iter()
            .filter_map(|r| {
                let ratio = r.success_ratio();
                let kind = if ratio >= self.config.prefer_ratio {
                    RecommendationKind::Prefer
                } else if ratio <= self.config.avoid_ratio {
                    RecommendationKind::Avoid
                } else {
                    return None;
                };
                Some(Recommendation {
                    kind,
                    domain: r.domain.clone(),
                    persona: r.persona.clone(),
                    success_rate: ratio,
                    samples: r.total_count,
                })
            })
            .collect();

        // strongest signal first: best prefers, then worst avoids
        recommendations.sort_by(|a, b| match (a.kind, b.kind) {
            (RecommendationKind::Prefer, RecommendationKind::Avoid) => Ordering::Less,
            (RecommendationKind::Avoid, RecommendationKind::Prefer) => Ordering::Greater,
            (RecommendationKind::Prefer, RecommendationKind::Prefer) => b
                .success_rate
                .total_cmp(&a.success_rate)
                .then_with(|| a.persona.cmp(&b.persona)),
            (RecommendationKind::Avoid, RecommendationKind::Avoid) => a
                .success_rate
                .total_cmp(&b.success_rate)
                .then_with(|| a.persona.cmp(&b.persona)),
        });
        recommendations.truncate(self.config.max_recommendations);
        recommendations
    }

    /// Record an outcome; dropped with a warning when the record stays busy
    pub fn record_outcome(&self, domain: &str, persona: &str, success: bool) -> Option<LearningRecord> {
        match self.store.record_outcome(domain, persona, success) {
            Ok(record) => {
                METRICS.record_learning_outcome(success);
                debug!(
                    "Recorded outcome for ({}, {}): {}/{}",
                    domain, persona, record.success_count, record.total_count
                );
                Some(record)
            }
            Err(e) => {
                METRICS.record_learning_dropped();
                warn!("Dropping learning outcome: {}", e);
                None
            }
        }
    }
}
