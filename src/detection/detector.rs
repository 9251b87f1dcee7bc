//! Context detector
//!
//! Converts a raw request into a scored [`Context`]. Every step is a pure
//! function of the request and the configuration: identical input always
//! yields an identical context.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

use super::config::{ComplexityConfig, ConfidenceConfig, DetectorConfig, RiskConfig};
use super::models::{Complexity, Context, ContextMetadata, DomainScore, Request, RiskLevel};
use super::risk::{RiskAssessor, RiskInputs};
use super::signals::{normalize_keywords, NormalizedKeyword, PathMatcher, TextSignals};

#[derive(Debug, Clone)]
struct CompiledDomain {
    name: String,
    keywords: Vec<NormalizedKeyword>,
    paths: PathMatcher,
    work_item_kinds: BTreeSet<String>,
    persona: Option<String>,
}

/// Raw per-domain signal counts before weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomainSignals {
    pub keyword_hits: usize,
    pub file_matches: usize,
    pub work_item_match: bool,
}

/// Deterministic context detector
#[derive(Debug, Clone)]
pub struct ContextDetector {
    config: DetectorConfig,
    complexity: ComplexityConfig,
    confidence: ConfidenceConfig,
    domains: Vec<CompiledDomain>,
    complexity_keywords: Vec<NormalizedKeyword>,
    risk: RiskAssessor,
}

impl ContextDetector {
    pub fn new(
        config: DetectorConfig,
        complexity: ComplexityConfig,
        risk: RiskConfig,
        confidence: ConfidenceConfig,
    ) -> Self {
        let domains = config
            .domains
            .iter()
            .map(|(name, rule)| CompiledDomain {
                name: name.clone(),
                keywords: normalize_keywords(&rule.keywords),
                paths: PathMatcher::new(&rule.path_patterns, &rule.extensions),
                work_item_kinds: rule
                    .work_item_kinds
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .collect(),
                persona: rule.persona.clone(),
            })
            .collect();
        let complexity_keywords = normalize_keywords(&complexity.keywords);

        Self {
            config,
            complexity,
            confidence,
            domains,
            complexity_keywords,
            risk: RiskAssessor::new(risk),
        }
    }

    /// Detector with the shipped default policy
    pub fn with_defaults() -> Self {
        Self::new(
            DetectorConfig::default(),
            ComplexityConfig::default(),
            RiskConfig::default(),
            ConfidenceConfig::default(),
        )
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect the context of a request
    pub fn detect(&self, request: &Request) -> Context {
        if request.is_malformed() {
            debug!("Request has no text and no files, using default context");
            return self.default_context(request);
        }

        let text = TextSignals::new(&request.text);
        let signals = self.domain_signals(request, &text);
        let keyword_hits = signals.iter().map(|(_, s)| s.keyword_hits).sum();
        let domains = self.rank_domains(&signals);

        let primary_domain = domains
            .first()
            .map(|d| d.domain.clone())
            .unwrap_or_else(|| self.config.general_domain.clone());
        let secondary_domains = self.secondary_domains(&domains);
        let persona = self.infer_persona(&primary_domain, &secondary_domains);
        let complexity = self.estimate_complexity(request, &text);

        let security = &self.risk.config().security_domain;
        let security_significant =
            &primary_domain == security || secondary_domains.iter().any(|d| d == security);
        let risk = self.risk.assess(
            request,
            RiskInputs {
                text: &text,
                security_significant,
                complexity,
            },
        );
        let confidence = self.confidence(&domains, complexity, risk.score);

        debug!(
            "Detected primary={}, secondary={:?}, persona={}, complexity={}, risk={:.2} ({}), confidence={:.3}",
            primary_domain,
            secondary_domains,
            persona,
            complexity.as_str(),
            risk.score,
            risk.level,
            confidence
        );

        Context {
            domains,
            primary_domain,
            secondary_domains,
            persona,
            complexity,
            risk_level: risk.level,
            risk_score: risk.score,
            confidence,
            metadata: ContextMetadata {
                risk_factors: risk.factors,
                has_work_item: request.has_linked_work_item(),
                degraded_input: false,
                file_count: request.files.len(),
                keyword_hits,
            },
        }
    }

    /// Raw signal counts for every configured domain, in declaration order
    pub fn domain_signals(&self, request: &Request, text: &TextSignals) -> Vec<(String, DomainSignals)> {
        let work_item_tags: BTreeSet<String> = request
            .work_item
            .iter()
            .flat_map(|w| w.kind.iter().chain(w.labels.iter()))
            .map(|t| t.trim().to_lowercase())
            .collect();

        self.domains
            .iter()
            .map(|domain| {
                let signals = DomainSignals {
                    keyword_hits: text.count_hits(&domain.keywords),
                    file_matches: domain
                        .paths
                        .count_matches(request.files.iter().map(|f| f.path.as_str())),
                    work_item_match: !domain.work_item_kinds.is_disjoint(&work_item_tags),
                };
                (domain.name.clone(), signals)
            })
            .collect()
    }

    fn weighted_score(&self, signals: &DomainSignals) -> f64 {
        let work_item = if signals.work_item_match { 1.0 } else { 0.0 };
        self.config.keyword_weight * signals.keyword_hits as f64
            + self.config.path_weight * signals.file_matches as f64
            + self.config.work_item_weight * work_item
    }

    /// Positive scores, highest first; ties keep declaration order
    fn rank_domains(&self, signals: &[(String, DomainSignals)]) -> Vec<DomainScore> {
        let mut ranked: Vec<(usize, DomainScore)> = signals
            .iter()
            .enumerate()
            .map(|(priority, (domain, s))| {
                (
                    priority,
                    DomainScore {
                        domain: domain.clone(),
                        score: self.weighted_score(s),
                    },
                )
            })
            .filter(|(_, d)| d.score > 0.0)
            .collect();

        ranked.sort_by(|(pa, a), (pb, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| pa.cmp(pb))
        });

        ranked.into_iter().map(|(_, d)| d).collect()
    }

    fn secondary_domains(&self, domains: &[DomainScore]) -> Vec<String> {
        let Some(top) = domains.first() else {
            return Vec::new();
        };
        let cutoff = top.score * self.config.significance_ratio;
        domains
            .iter()
            .skip(1)
            .filter(|d| d.score >= cutoff)
            .map(|d| d.domain.clone())
            .collect()
    }

    /// Persona lookup from the domain vector; never looks at raw text
    pub fn infer_persona(&self, primary: &str, secondary: &[String]) -> String {
        let rule = self.config.persona_rules.iter().find(|rule| {
            rule.primary == primary
                && rule
                    .with_secondary
                    .as_ref()
                    .map(|s| secondary.contains(s))
                    .unwrap_or(true)
        });
        if let Some(rule) = rule {
            return rule.persona.clone();
        }

        self.domains
            .iter()
            .find(|d| d.name == primary)
            .and_then(|d| d.persona.clone())
            .unwrap_or_else(|| self.config.default_persona.clone())
    }

    /// Point-based complexity from file count, diff size and keyword density
    pub fn estimate_complexity(&self, request: &Request, text: &TextSignals) -> Complexity {
        let cfg = &self.complexity;
        let mut points = 0u32;

        let files = request.files.len();
        if files >= cfg.high_files {
            points += 2;
        } else if files >= cfg.medium_files {
            points += 1;
        }

        let lines: u64 = request
            .files
            .iter()
            .filter_map(|f| f.lines_changed)
            .map(u64::from)
            .sum();
        if lines >= cfg.high_lines {
            points += 2;
        } else if lines >= cfg.medium_lines {
            points += 1;
        }

        let hits = text.count_hits(&self.complexity_keywords);
        if hits >= cfg.high_keyword_hits {
            points += 2;
        } else if hits >= cfg.medium_keyword_hits && hits > 0 {
            points += 1;
        }

        if text.word_count() > 0 {
            let density = hits as f64 / text.word_count() as f64;
            if hits > 0 && density >= cfg.high_density {
                points += 1;
            }
        }

        if points >= cfg.high_points {
            Complexity::High
        } else if points >= cfg.medium_points {
            Complexity::Medium
        } else {
            Complexity::Low
        }
    }

    /// Confidence from the gap between the top domains.
    ///
    /// Classified requests land in `(floor, 1]`; `floor` itself is reserved for
    /// the default context. Each extra conflicting domain scales the certainty
    /// by `1 - conflict_penalty`, so wider ties never bottom out.
    pub fn confidence(&self, domains: &[DomainScore], complexity: Complexity, risk_score: f64) -> f64 {
        let cfg = &self.confidence;
        let Some(top) = domains.first() else {
            return cfg.floor;
        };
        if top.score <= 0.0 {
            return cfg.floor;
        }

        let runner_up = domains.get(1).map(|d| d.score).unwrap_or(0.0);
        let closeness = runner_up / top.score;
        let cutoff = top.score * self.config.significance_ratio;
        let conflicting = domains.iter().skip(1).filter(|d| d.score >= cutoff).count();
        let extra = conflicting.saturating_sub(1) as i32;

        let mut certainty =
            (1.0 - cfg.ambiguity_weight * closeness) * (1.0 - cfg.conflict_penalty).powi(extra);
        if complexity == Complexity::High && risk_score >= self.risk.config().thresholds.high {
            certainty *= cfg.compound_discount;
        }

        (cfg.floor + (1.0 - cfg.floor) * certainty).min(1.0)
    }

    fn default_context(&self, request: &Request) -> Context {
        let primary_domain = self.config.general_domain.clone();
        let persona = self.infer_persona(&primary_domain, &[]);
        Context {
            domains: Vec::new(),
            primary_domain,
            secondary_domains: Vec::new(),
            persona,
            complexity: Complexity::Low,
            risk_level: RiskLevel::Low,
            risk_score: 0.0,
            confidence: self.confidence.floor,
            metadata: ContextMetadata {
                has_work_item: request.has_linked_work_item(),
                degraded_input: true,
                ..Default::default()
            },
        }
    }
}
