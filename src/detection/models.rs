//! Request and context data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of change applied to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A file touched by the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub change_kind: ChangeKind,
    /// Estimated diff magnitude, when the caller knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_changed: Option<u32>,
}

impl FileRef {
    pub fn new(path: impl Into<String>, change_kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            change_kind,
            lines_changed: None,
        }
    }

    pub fn with_lines_changed(mut self, lines: u32) -> Self {
        self.lines_changed = Some(lines);
        self
    }
}

/// Linked work item (ticket, issue)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl WorkItemRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: None,
            labels: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// A work item only counts as linked when it carries a key
    pub fn is_linked(&self) -> bool {
        !self.key.trim().is_empty()
    }
}

/// Incoming development request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item: Option<WorkItemRef>,
}

impl Request {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: Vec::new(),
            work_item: None,
        }
    }

    pub fn with_file(mut self, file: FileRef) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_work_item(mut self, work_item: WorkItemRef) -> Self {
        self.work_item = Some(work_item);
        self
    }

    /// Blank text and no files: nothing to classify
    pub fn is_malformed(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }

    pub fn has_linked_work_item(&self) -> bool {
        self.work_item.as_ref().map(WorkItemRef::is_linked).unwrap_or(false)
    }
}

/// Score of a single domain for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: String,
    pub score: f64,
}

/// Estimated complexity of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

/// Bucketed risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumerable risk factors contributing to the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    ProductionPath,
    InfrastructurePath,
    SecurityDomain,
    NoTestChanges,
    MissingWorkItem,
    DeletedFiles,
    LargeChangeSet,
    RiskKeywords,
    HighComplexity,
}

impl RiskFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::ProductionPath => "production_path",
            RiskFactor::InfrastructurePath => "infrastructure_path",
            RiskFactor::SecurityDomain => "security_domain",
            RiskFactor::NoTestChanges => "no_test_changes",
            RiskFactor::MissingWorkItem => "missing_work_item",
            RiskFactor::DeletedFiles => "deleted_files",
            RiskFactor::LargeChangeSet => "large_change_set",
            RiskFactor::RiskKeywords => "risk_keywords",
            RiskFactor::HighComplexity => "high_complexity",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub risk_factors: BTreeSet<RiskFactor>,
    pub has_work_item: bool,
    /// Set when the request carried nothing to classify
    pub degraded_input: bool,
    pub file_count: usize,
    pub keyword_hits: usize,
}

impl ContextMetadata {
    pub fn risk_factor_names(&self) -> Vec<String> {
        self.risk_factors.iter().map(|f| f.as_str().to_string()).collect()
    }
}

/// Structured, scored context of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Positive domain scores, highest first
    pub domains: Vec<DomainScore>,
    pub primary_domain: String,
    /// Domains other than the primary above the significance cutoff, in score order
    pub secondary_domains: Vec<String>,
    pub persona: String,
    pub complexity: Complexity,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub confidence: f64,
    pub metadata: ContextMetadata,
}

impl Context {
    /// Score of a domain, zero when it did not apply
    pub fn domain_score(&self, domain: &str) -> f64 {
        self.domains
            .iter()
            .find(|d| d.domain == domain)
            .map(|d| d.score)
            .unwrap_or(0.0)
    }

    /// Derive a context with a different persona
    pub fn with_persona(&self, persona: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.persona = persona.into();
        derived
    }

    /// Check the numeric invariants every context must hold
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(bad) = self
            .domains
            .iter()
            .find(|d| !d.score.is_finite() || d.score < 0.0)
        {
            return Err(format!("domain '{}' has invalid score {}", bad.domain, bad.score));
        }
        if !self.risk_score.is_finite() || !(0.0..=10.0).contains(&self.risk_score) {
            return Err(format!("risk score {} out of range", self.risk_score));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} out of range", self.confidence));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_request() {
        assert!(Request::new("   ").is_malformed());
        assert!(!Request::new("fix bug").is_malformed());
        let files_only = Request::new("").with_file(FileRef::new("a.rs", ChangeKind::Added));
        assert!(!files_only.is_malformed());
    }

    #[test]
    fn test_blank_work_item_is_not_linked() {
        let request = Request::new("x").with_work_item(WorkItemRef::new("  "));
        assert!(!request.has_linked_work_item());
        let request = Request::new("x").with_work_item(WorkItemRef::new("PROJ-12"));
        assert!(request.has_linked_work_item());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: Request = serde_json::from_str(
            r#"{"files":[{"path":"src/lib.rs","change_kind":"modified"}]}"#,
        )
        .unwrap();
        assert!(request.text.is_empty());
        assert_eq!(request.files[0].change_kind, ChangeKind::Modified);
        assert!(request.work_item.is_none());
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
    }
}
