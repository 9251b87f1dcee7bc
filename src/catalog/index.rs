//! Indexed instruction catalog
//!
//! Built once per load: inconsistent entries are excluded, the rest are
//! indexed by tag so lookups cost O(matches) instead of a full scan.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use super::models::{ExcludedEntry, InstructionEntry, InstructionType};

/// Read-only, indexed catalog snapshot
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<InstructionEntry>,
    by_kind: BTreeMap<InstructionType, Vec<usize>>,
    by_id: BTreeMap<String, usize>,
    by_tag: BTreeMap<String, Vec<usize>>,
    excluded: Vec<ExcludedEntry>,
    fingerprint: String,
}

impl Catalog {
    /// Build a catalog, excluding entries that are inconsistent
    ///
    /// When `content_root` is given, entries whose path does not exist below it
    /// are excluded as well.
    pub fn build(entries: Vec<InstructionEntry>, content_root: Option<&Path>) -> Self {
        let mut accepted = Vec::with_capacity(entries.len());
        let mut excluded = Vec::new();
        let mut seen = HashSet::new();

        for mut entry in entries {
            let reason = if entry.id.trim().is_empty() {
                Some("missing id".to_string())
            } else if entry.path.trim().is_empty() {
                Some("missing path".to_string())
            } else if seen.contains(&entry.id) {
                Some("duplicate id".to_string())
            } else {
                content_root
                    .map(|root| root.join(&entry.path))
                    .filter(|full| !full.exists())
                    .map(|full| format!("file not found: {}", full.display()))
            };

            if let Some(reason) = reason {
                warn!(
                    "Excluding catalog entry id='{}' path='{}': {}",
                    entry.id, entry.path, reason
                );
                excluded.push(ExcludedEntry {
                    id: entry.id,
                    path: entry.path,
                    reason,
                });
                continue;
            }

            entry.tags = entry
                .tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            seen.insert(entry.id.clone());
            accepted.push(entry);
        }

        let mut catalog = Self {
            entries: accepted,
            excluded,
            ..Default::default()
        };
        catalog.index();
        debug!(
            "Built catalog: {} entries ({} core), {} tags, {} excluded",
            catalog.entries.len(),
            catalog.of_kind(InstructionType::Core).len(),
            catalog.by_tag.len(),
            catalog.excluded.len()
        );
        catalog
    }

    fn index(&mut self) {
        for (pos, entry) in self.entries.iter().enumerate() {
            self.by_id.insert(entry.id.clone(), pos);
            self.by_kind.entry(entry.kind).or_default().push(pos);
            for tag in &entry.tags {
                self.by_tag.entry(tag.clone()).or_default().push(pos);
            }
        }
        self.fingerprint = fingerprint(&self.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[InstructionEntry] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<&InstructionEntry> {
        self.entries.get(position)
    }

    pub fn get(&self, id: &str) -> Option<&InstructionEntry> {
        self.by_id.get(id).and_then(|pos| self.entries.get(*pos))
    }

    /// Core entries in catalog order
    pub fn core(&self) -> impl Iterator<Item = (usize, &InstructionEntry)> + '_ {
        self.of_kind(InstructionType::Core)
            .iter()
            .map(move |pos| (*pos, &self.entries[*pos]))
    }

    /// Catalog positions of entries of one type, in catalog order
    pub fn of_kind(&self, kind: InstructionType) -> &[usize] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Catalog positions of entries carrying `tag`, in catalog order
    pub fn tagged(&self, tag: &str) -> &[usize] {
        self.by_tag
            .get(&tag.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_tag.keys().map(String::as_str)
    }

    /// Entries rejected while building
    pub fn excluded(&self) -> &[ExcludedEntry] {
        &self.excluded
    }

    pub(crate) fn record_exclusions(&mut self, excluded: Vec<ExcludedEntry>) {
        self.excluded.extend(excluded);
    }

    /// SHA-256 over the accepted entries, independent of feed order
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(entries: &[InstructionEntry]) -> String {
    let mut sorted: Vec<&InstructionEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for entry in sorted {
        hasher.update(entry.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.kind.as_str().as_bytes());
        hasher.update([0u8]);
        for tag in &entry.tags {
            hasher.update(tag.as_bytes());
            hasher.update([b',']);
        }
        hasher.update(entry.size_cost.to_le_bytes());
        hasher.update([b'\n']);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::InstructionType;

    fn sample() -> Vec<InstructionEntry> {
        vec![
            InstructionEntry::new("core-base", "core/base.md", InstructionType::Core, 100),
            InstructionEntry::new("sec-review", "personas/sec.md", InstructionType::Persona, 200)
                .with_tags(["Security-Reviewer", "security"]),
            InstructionEntry::new("sec-domain", "domains/security.md", InstructionType::Domain, 300)
                .with_tags(["security"]),
        ]
    }

    #[test]
    fn test_build_indexes_tags() {
        let catalog = Catalog::build(sample(), None);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.tagged("security"), &[1, 2]);
        assert_eq!(catalog.tagged("SECURITY-REVIEWER "), &[1]);
        assert!(catalog.tagged("unknown").is_empty());
        assert_eq!(catalog.core().count(), 1);
        assert_eq!(catalog.of_kind(InstructionType::Persona), &[1]);
        assert!(catalog.of_kind(InstructionType::Risk).is_empty());
    }

    #[test]
    fn test_inconsistent_entries_excluded() {
        let mut entries = sample();
        entries.push(InstructionEntry::new("", "x.md", InstructionType::Domain, 1));
        entries.push(InstructionEntry::new("no-path", " ", InstructionType::Domain, 1));
        entries.push(InstructionEntry::new("core-base", "dup.md", InstructionType::Core, 1));

        let catalog = Catalog::build(entries, None);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.excluded().len(), 3);
        assert_eq!(catalog.get("core-base").map(|e| e.path.as_str()), Some("core/base.md"));
        assert!(catalog.excluded().iter().any(|e| e.reason == "duplicate id"));
    }

    #[test]
    fn test_missing_files_excluded_under_content_root() {
        let root = std::env::temp_dir().join(format!("catalog-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join("core")).unwrap();
        std::fs::write(root.join("core/base.md"), "base rules").unwrap();

        let catalog = Catalog::build(sample(), Some(&root));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("core-base").is_some());
        assert!(catalog.excluded().iter().all(|e| e.reason.starts_with("file not found")));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_fingerprint_ignores_feed_order() {
        let forward = Catalog::build(sample(), None);
        let mut reversed = sample();
        reversed.reverse();
        let backward = Catalog::build(reversed, None);
        assert_eq!(forward.fingerprint(), backward.fingerprint());
        assert_eq!(forward.fingerprint().len(), 64);

        let mut changed = sample();
        changed[0].size_cost = 101;
        assert_ne!(Catalog::build(changed, None).fingerprint(), forward.fingerprint());
    }
}
