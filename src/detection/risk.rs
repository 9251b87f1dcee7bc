//! Risk scoring over an enumerable set of factors

use std::collections::BTreeSet;

use super::config::RiskConfig;
use super::models::{ChangeKind, Complexity, Request, RiskFactor, RiskLevel};
use super::signals::{normalize_keywords, NormalizedKeyword, PathMatcher, TextSignals};

/// Result of risk scoring
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub factors: BTreeSet<RiskFactor>,
}

/// Request-derived inputs the assessor needs besides the request itself
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub text: &'a TextSignals,
    /// Security domain is primary or significant secondary
    pub security_significant: bool,
    pub complexity: Complexity,
}

/// Risk assessor with pre-compiled matchers
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    config: RiskConfig,
    production: PathMatcher,
    infrastructure: PathMatcher,
    tests: PathMatcher,
    keywords: Vec<NormalizedKeyword>,
}

impl RiskAssessor {
    pub fn new(config: RiskConfig) -> Self {
        let production = PathMatcher::new(&config.production_patterns, &[]);
        let infrastructure = PathMatcher::new(&config.infrastructure_patterns, &[]);
        let tests = PathMatcher::new(&config.test_patterns, &[]);
        let keywords = normalize_keywords(&config.risk_keywords);
        Self {
            config,
            production,
            infrastructure,
            tests,
            keywords,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Collect the factors present in a request
    pub fn factors(&self, request: &Request, inputs: RiskInputs<'_>) -> BTreeSet<RiskFactor> {
        let mut factors = BTreeSet::new();
        let paths = || request.files.iter().map(|f| f.path.as_str());

        if paths().any(|p| self.production.matches(p)) {
            factors.insert(RiskFactor::ProductionPath);
        }
        if paths().any(|p| self.infrastructure.matches(p)) {
            factors.insert(RiskFactor::InfrastructurePath);
        }
        if inputs.security_significant {
            factors.insert(RiskFactor::SecurityDomain);
        }
        if !request.files.is_empty() {
            if !paths().any(|p| self.tests.matches(p)) {
                factors.insert(RiskFactor::NoTestChanges);
            }
            if !request.has_linked_work_item() {
                factors.insert(RiskFactor::MissingWorkItem);
            }
        }
        if request
            .files
            .iter()
            .any(|f| f.change_kind == ChangeKind::Deleted)
        {
            factors.insert(RiskFactor::DeletedFiles);
        }
        if request.files.len() >= self.config.large_change_files {
            factors.insert(RiskFactor::LargeChangeSet);
        }
        if inputs.text.count_hits(&self.keywords) > 0 {
            factors.insert(RiskFactor::RiskKeywords);
        }
        if inputs.complexity == Complexity::High {
            factors.insert(RiskFactor::HighComplexity);
        }

        factors
    }

    /// Fixed points per factor, summed and clamped to [0, 10]
    pub fn assess(&self, request: &Request, inputs: RiskInputs<'_>) -> RiskAssessment {
        let factors = self.factors(request, inputs);
        let score = factors
            .iter()
            .map(|f| self.points(*f))
            .sum::<f64>()
            .clamp(0.0, 10.0);

        RiskAssessment {
            score,
            level: self.config.thresholds.level(score),
            factors,
        }
    }

    pub fn points(&self, factor: RiskFactor) -> f64 {
        let p = &self.config.points;
        match factor {
            RiskFactor::ProductionPath => p.production_path,
            RiskFactor::InfrastructurePath => p.infrastructure_path,
            RiskFactor::SecurityDomain => p.security_domain,
            RiskFactor::NoTestChanges => p.no_test_changes,
            RiskFactor::MissingWorkItem => p.missing_work_item,
            RiskFactor::DeletedFiles => p.deleted_files,
            RiskFactor::LargeChangeSet => p.large_change_set,
            RiskFactor::RiskKeywords => p.risk_keywords,
            RiskFactor::HighComplexity => p.high_complexity,
        }
    }
}
