//! Instruction catalog data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Instruction entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionType {
    /// Always loaded
    Core,
    Persona,
    Domain,
    Risk,
}

impl InstructionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionType::Core => "core",
            InstructionType::Persona => "persona",
            InstructionType::Domain => "domain",
            InstructionType::Risk => "risk",
        }
    }
}

impl fmt::Display for InstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressable instruction entry; content is opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionEntry {
    pub id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: InstructionType,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub size_cost: u32,
}

impl InstructionEntry {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        kind: InstructionType,
        size_cost: u32,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            kind,
            tags: BTreeSet::new(),
            size_cost,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn is_core(&self) -> bool {
        self.kind == InstructionType::Core
    }

    /// Values of `prefix:value` tags
    pub fn tag_values<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags.iter().filter_map(move |t| {
            t.split_once(':')
                .filter(|(p, _)| *p == prefix)
                .map(|(_, v)| v)
        })
    }
}

/// Catalog feed record; `size_cost` may be left for the loader to estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: InstructionType,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_cost: Option<u32>,
}

impl CatalogRecord {
    /// Convert when the size cost is already known
    pub fn into_entry(self) -> Option<InstructionEntry> {
        let size_cost = self.size_cost?;
        Some(InstructionEntry {
            id: self.id,
            path: self.path,
            kind: self.kind,
            tags: self.tags,
            size_cost,
        })
    }
}

impl From<InstructionEntry> for CatalogRecord {
    fn from(entry: InstructionEntry) -> Self {
        Self {
            id: entry.id,
            path: entry.path,
            kind: entry.kind,
            tags: entry.tags,
            size_cost: Some(entry.size_cost),
        }
    }
}

/// Entry rejected while building a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedEntry {
    pub id: String,
    pub path: String,
    pub reason: String,
}
