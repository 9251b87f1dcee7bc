//! Configuration for context detection
//!
//! Keyword lists, path patterns, weights and thresholds below are the shipped
//! defaults. Deploying organisations replace them through [`crate::EngineConfig`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::models::RiskLevel;
use crate::error::{EngineError, Result};

/// Signal rules for one domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRule {
    /// Words or phrases matched against the request text
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Glob patterns matched against changed file paths
    #[serde(default)]
    pub path_patterns: Vec<String>,

    /// File extensions (without the dot)
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Work item kinds or labels that indicate this domain
    #[serde(default)]
    pub work_item_kinds: Vec<String>,

    /// Persona used when this domain is primary and no persona rule matches
    #[serde(default)]
    pub persona: Option<String>,
}

/// Persona override for a domain combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRule {
    pub primary: String,
    #[serde(default)]
    pub with_secondary: Option<String>,
    pub persona: String,
}

/// Context detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Weight of each distinct keyword hit
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Weight of each matching file
    #[serde(default = "default_path_weight")]
    pub path_weight: f64,

    /// Weight of a matching work item
    #[serde(default = "default_work_item_weight")]
    pub work_item_weight: f64,

    /// Secondary domains must reach this fraction of the top score
    #[serde(default = "default_significance_ratio")]
    pub significance_ratio: f64,

    /// Domain reported when nothing scores
    #[serde(default = "default_general_domain")]
    pub general_domain: String,

    #[serde(default = "default_persona")]
    pub default_persona: String,

    /// Domain rules; declaration order is the tie-break priority
    #[serde(default = "default_domains")]
    pub domains: IndexMap<String, DomainRule>,

    /// Evaluated in order, first match wins
    #[serde(default = "default_persona_rules")]
    pub persona_rules: Vec<PersonaRule>,
}

fn default_keyword_weight() -> f64 {
    1.0
}

fn default_path_weight() -> f64 {
    1.5
}

fn default_work_item_weight() -> f64 {
    2.0
}

fn default_significance_ratio() -> f64 {
    0.5
}

fn default_general_domain() -> String {
    "general".to_string()
}

fn default_persona() -> String {
    "generalist".to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_domains() -> IndexMap<String, DomainRule> {
    let mut domains = IndexMap::new();

    domains.insert(
        "security".to_string(),
        DomainRule {
            keywords: strings(&[
                "security", "vulnerability", "injection", "sql injection", "xss", "csrf",
                "auth", "authentication", "authorization", "login", "password", "credential",
                "secret", "token", "encrypt", "encryption", "permission", "cve", "sanitize",
            ]),
            path_patterns: strings(&[
                "auth/**", "**/auth/**", "security/**", "**/security/**", "**/*crypto*",
                "**/*secret*",
            ]),
            extensions: strings(&["pem", "key"]),
            work_item_kinds: strings(&["security", "vulnerability"]),
            persona: Some("security-reviewer".to_string()),
        },
    );

    domains.insert(
        "infrastructure".to_string(),
        DomainRule {
            keywords: strings(&[
                "deploy", "deployment", "infrastructure", "terraform", "kubernetes", "k8s",
                "docker", "helm", "pipeline", "ci", "ansible", "nginx", "cluster",
                "provisioning",
            ]),
            path_patterns: strings(&[
                "terraform/**", "**/terraform/**", "k8s/**", "**/k8s/**", "helm/**",
                "**/helm/**", "infra/**", "**/infra/**", ".github/workflows/**",
                "Dockerfile", "**/Dockerfile", "docker-compose*",
            ]),
            extensions: strings(&["tf", "tfvars", "hcl"]),
            work_item_kinds: strings(&["ops", "infrastructure"]),
            persona: Some("devops-engineer".to_string()),
        },
    );

    domains.insert(
        "database".to_string(),
        DomainRule {
            keywords: strings(&[
                "database", "schema", "migration", "sql", "query", "table", "postgres",
                "mysql", "sqlite", "orm",
            ]),
            path_patterns: strings(&["migrations/**", "**/migrations/**", "db/**", "**/db/**"]),
            extensions: strings(&["sql"]),
            work_item_kinds: strings(&["data"]),
            persona: Some("database-engineer".to_string()),
        },
    );

    domains.insert(
        "development".to_string(),
        DomainRule {
            keywords: strings(&[
                "fix", "bug", "implement", "feature", "refactor", "function", "handler",
                "endpoint", "api", "class", "module", "code",
            ]),
            path_patterns: strings(&["src/**", "**/src/**", "lib/**"]),
            extensions: strings(&[
                "rs", "py", "js", "ts", "go", "java", "kt", "rb", "c", "cpp", "h", "cs", "swift",
            ]),
            work_item_kinds: strings(&["bug", "story", "feature", "task"]),
            persona: Some("software-engineer".to_string()),
        },
    );

    domains.insert(
        "testing".to_string(),
        DomainRule {
            keywords: strings(&[
                "test", "tests", "testing", "coverage", "flaky", "assertion", "mock", "fixture",
                "e2e", "regression",
            ]),
            path_patterns: strings(&[
                "tests/**", "**/tests/**", "test/**", "**/test/**", "**/*_test.*",
                "**/*.test.*", "**/*_spec.*", "**/*.spec.*",
            ]),
            extensions: Vec::new(),
            work_item_kinds: strings(&["test"]),
            persona: Some("qa-engineer".to_string()),
        },
    );

    domains.insert(
        "documentation".to_string(),
        DomainRule {
            keywords: strings(&[
                "docs", "documentation", "readme", "guide", "tutorial", "changelog",
            ]),
            path_patterns: strings(&["docs/**", "**/docs/**", "README*", "**/README*", "CHANGELOG*"]),
            extensions: strings(&["md", "rst", "adoc"]),
            work_item_kinds: strings(&["docs", "documentation"]),
            persona: Some("technical-writer".to_string()),
        },
    );

    domains
}

fn default_persona_rules() -> Vec<PersonaRule> {
    vec![
        PersonaRule {
            primary: "development".to_string(),
            with_secondary: Some("security".to_string()),
            persona: "security-engineer".to_string(),
        },
        PersonaRule {
            primary: "infrastructure".to_string(),
            with_secondary: Some("security".to_string()),
            persona: "security-engineer".to_string(),
        },
        PersonaRule {
            primary: "development".to_string(),
            with_secondary: Some("database".to_string()),
            persona: "backend-engineer".to_string(),
        },
    ]
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            path_weight: default_path_weight(),
            work_item_weight: default_work_item_weight(),
            significance_ratio: default_significance_ratio(),
            general_domain: default_general_domain(),
            default_persona: default_persona(),
            domains: default_domains(),
            persona_rules: default_persona_rules(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("keyword_weight", self.keyword_weight),
            ("path_weight", self.path_weight),
            ("work_item_weight", self.work_item_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::Configuration(format!(
                    "detector.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.significance_ratio) {
            return Err(EngineError::Configuration(format!(
                "detector.significance_ratio must be within [0, 1], got {}",
                self.significance_ratio
            )));
        }
        for (domain, rule) in &self.domains {
            for pattern in &rule.path_patterns {
                glob::Pattern::new(pattern).map_err(|e| {
                    EngineError::Configuration(format!(
                        "domain '{}' has invalid path pattern '{}': {}",
                        domain, pattern, e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

/// Complexity estimation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityConfig {
    #[serde(default = "default_medium_files")]
    pub medium_files: usize,
    #[serde(default = "default_high_files")]
    pub high_files: usize,
    #[serde(default = "default_medium_lines")]
    pub medium_lines: u64,
    #[serde(default = "default_high_lines")]
    pub high_lines: u64,
    #[serde(default = "default_complexity_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_medium_keyword_hits")]
    pub medium_keyword_hits: usize,
    #[serde(default = "default_high_keyword_hits")]
    pub high_keyword_hits: usize,
    /// Keyword hits per word that adds one more point
    #[serde(default = "default_high_density")]
    pub high_density: f64,
    #[serde(default = "default_medium_points")]
    pub medium_points: u32,
    #[serde(default = "default_high_points")]
    pub high_points: u32,
}

fn default_medium_files() -> usize {
    4
}

fn default_high_files() -> usize {
    10
}

fn default_medium_lines() -> u64 {
    150
}

fn default_high_lines() -> u64 {
    600
}

fn default_complexity_keywords() -> Vec<String> {
    strings(&[
        "refactor", "architecture", "redesign", "rewrite", "migration", "concurrency",
        "distributed", "performance", "integration", "async", "multiple", "cross-cutting",
    ])
}

fn default_medium_keyword_hits() -> usize {
    1
}

fn default_high_keyword_hits() -> usize {
    3
}

fn default_high_density() -> f64 {
    0.2
}

fn default_medium_points() -> u32 {
    2
}

fn default_high_points() -> u32 {
    4
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            medium_files: default_medium_files(),
            high_files: default_high_files(),
            medium_lines: default_medium_lines(),
            high_lines: default_high_lines(),
            keywords: default_complexity_keywords(),
            medium_keyword_hits: default_medium_keyword_hits(),
            high_keyword_hits: default_high_keyword_hits(),
            high_density: default_high_density(),
            medium_points: default_medium_points(),
            high_points: default_high_points(),
        }
    }
}

/// Risk score cutoffs, shared by the detector and the risk gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_medium_threshold")]
    pub medium: f64,
    #[serde(default = "default_high_threshold")]
    pub high: f64,
    #[serde(default = "default_critical_threshold")]
    pub critical: f64,
}

fn default_medium_threshold() -> f64 {
    3.0
}

fn default_high_threshold() -> f64 {
    6.0
}

fn default_critical_threshold() -> f64 {
    8.0
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: default_medium_threshold(),
            high: default_high_threshold(),
            critical: default_critical_threshold(),
        }
    }
}

impl RiskThresholds {
    /// Bucket a risk score
    pub fn level(&self, score: f64) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.medium
            && self.medium <= self.high
            && self.high <= self.critical
            && self.critical <= 10.0;
        if !ordered {
            return Err(EngineError::Configuration(format!(
                "risk thresholds must satisfy 0 <= medium <= high <= critical <= 10, got {}/{}/{}",
                self.medium, self.high, self.critical
            )));
        }
        Ok(())
    }
}

/// Points contributed by each risk factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPoints {
    #[serde(default = "points_production_path")]
    pub production_path: f64,
    #[serde(default = "points_infrastructure_path")]
    pub infrastructure_path: f64,
    #[serde(default = "points_security_domain")]
    pub security_domain: f64,
    #[serde(default = "points_no_test_changes")]
    pub no_test_changes: f64,
    #[serde(default = "points_missing_work_item")]
    pub missing_work_item: f64,
    #[serde(default = "points_deleted_files")]
    pub deleted_files: f64,
    #[serde(default = "points_large_change_set")]
    pub large_change_set: f64,
    #[serde(default = "points_risk_keywords")]
    pub risk_keywords: f64,
    #[serde(default = "points_high_complexity")]
    pub high_complexity: f64,
}

fn points_production_path() -> f64 {
    3.0
}

fn points_infrastructure_path() -> f64 {
    2.0
}

fn points_security_domain() -> f64 {
    2.5
}

fn points_no_test_changes() -> f64 {
    1.5
}

fn points_missing_work_item() -> f64 {
    1.0
}

fn points_deleted_files() -> f64 {
    1.0
}

fn points_large_change_set() -> f64 {
    1.0
}

fn points_risk_keywords() -> f64 {
    1.5
}

fn points_high_complexity() -> f64 {
    1.0
}

impl Default for RiskPoints {
    fn default() -> Self {
        Self {
            production_path: points_production_path(),
            infrastructure_path: points_infrastructure_path(),
            security_domain: points_security_domain(),
            no_test_changes: points_no_test_changes(),
            missing_work_item: points_missing_work_item(),
            deleted_files: points_deleted_files(),
            large_change_set: points_large_change_set(),
            risk_keywords: points_risk_keywords(),
            high_complexity: points_high_complexity(),
        }
    }
}

/// Risk scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,

    #[serde(default)]
    pub points: RiskPoints,

    #[serde(default = "default_production_patterns")]
    pub production_patterns: Vec<String>,

    #[serde(default = "default_infrastructure_patterns")]
    pub infrastructure_patterns: Vec<String>,

    #[serde(default = "default_test_patterns")]
    pub test_patterns: Vec<String>,

    #[serde(default = "default_risk_keywords")]
    pub risk_keywords: Vec<String>,

    /// Domain whose presence raises the security factor
    #[serde(default = "default_security_domain")]
    pub security_domain: String,

    #[serde(default = "default_large_change_files")]
    pub large_change_files: usize,
}

fn default_production_patterns() -> Vec<String> {
    strings(&[
        "prod/**", "**/prod/**", "production/**", "**/production/**", "**/*.prod.*",
        "**/*production*",
    ])
}

fn default_infrastructure_patterns() -> Vec<String> {
    strings(&[
        "terraform/**", "**/terraform/**", "k8s/**", "**/k8s/**", "helm/**", "**/helm/**",
        "infra/**", "**/infra/**", ".github/workflows/**", "Dockerfile", "**/Dockerfile",
        "**/*.tf",
    ])
}

fn default_test_patterns() -> Vec<String> {
    strings(&[
        "tests/**", "**/tests/**", "test/**", "**/test/**", "**/*_test.*", "**/*.test.*",
        "**/*_spec.*", "**/*.spec.*", "**/test_*",
    ])
}

fn default_risk_keywords() -> Vec<String> {
    strings(&[
        "production", "prod", "hotfix", "rollback", "credential", "credentials", "outage",
        "emergency", "drop", "truncate", "force push",
    ])
}

fn default_security_domain() -> String {
    "security".to_string()
}

fn default_large_change_files() -> usize {
    20
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            points: RiskPoints::default(),
            production_patterns: default_production_patterns(),
            infrastructure_patterns: default_infrastructure_patterns(),
            test_patterns: default_test_patterns(),
            risk_keywords: default_risk_keywords(),
            security_domain: default_security_domain(),
            large_change_files: default_large_change_files(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        let p = &self.points;
        let all = [
            p.production_path,
            p.infrastructure_path,
            p.security_domain,
            p.no_test_changes,
            p.missing_work_item,
            p.deleted_files,
            p.large_change_set,
            p.risk_keywords,
            p.high_complexity,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::Configuration(
                "risk.points must all be non-negative numbers".to_string(),
            ));
        }
        for pattern in self
            .production_patterns
            .iter()
            .chain(&self.infrastructure_patterns)
            .chain(&self.test_patterns)
        {
            glob::Pattern::new(pattern).map_err(|e| {
                EngineError::Configuration(format!("invalid risk pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }
}

/// Confidence calculation constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Lowest reported confidence, also used for unclassifiable requests
    #[serde(default = "default_confidence_floor")]
    pub floor: f64,

    /// Weight of the second-best/best score ratio
    #[serde(default = "default_ambiguity_weight")]
    pub ambiguity_weight: f64,

    /// Deducted per additional conflicting domain beyond the runner-up
    #[serde(default = "default_conflict_penalty")]
    pub conflict_penalty: f64,

    /// Multiplier when complexity is high and risk reaches the high threshold
    #[serde(default = "default_compound_discount")]
    pub compound_discount: f64,
}

fn default_confidence_floor() -> f64 {
    0.2
}

fn default_ambiguity_weight() -> f64 {
    0.5
}

fn default_conflict_penalty() -> f64 {
    0.1
}

fn default_compound_discount() -> f64 {
    0.8
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            floor: default_confidence_floor(),
            ambiguity_weight: default_ambiguity_weight(),
            conflict_penalty: default_conflict_penalty(),
            compound_discount: default_compound_discount(),
        }
    }
}

impl ConfidenceConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("floor", self.floor),
            ("ambiguity_weight", self.ambiguity_weight),
            ("conflict_penalty", self.conflict_penalty),
            ("compound_discount", self.compound_discount),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Configuration(format!(
                    "confidence.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        // every classified request must stay above the floor and keep losing
        // confidence as ties widen
        for (name, value) in [
            ("floor", self.floor),
            ("ambiguity_weight", self.ambiguity_weight),
            ("conflict_penalty", self.conflict_penalty),
        ] {
            if value >= 1.0 {
                return Err(EngineError::Configuration(format!(
                    "confidence.{} must be below 1, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("conflict_penalty", self.conflict_penalty),
            ("compound_discount", self.compound_discount),
        ] {
            if value <= 0.0 {
                return Err(EngineError::Configuration(format!(
                    "confidence.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
