//! Learning store
//!
//! The only state that outlives a request. Updates to one (domain, persona)
//! key are applied under that key's shard lock, so concurrent outcomes for
//! the same pair never lose increments.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::models::LearningRecord;
use super::LearningError;

/// Storage for learning records
pub trait LearningStore: Send + Sync {
    /// Apply one outcome atomically and return the updated record
    fn record_outcome(
        &self,
        domain: &str,
        persona: &str,
        success: bool,
    ) -> Result<LearningRecord, LearningError>;

    fn get(&self, domain: &str, persona: &str) -> Option<LearningRecord>;

    /// Records of one domain, ordered by persona
    fn records_for_domain(&self, domain: &str) -> Vec<LearningRecord>;

    /// All records, ordered by (domain, persona)
    fn snapshot(&self) -> Vec<LearningRecord>;
}

/// Serialized store contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSnapshot {
    pub taken_at: DateTime<Utc>,
    pub records: Vec<LearningRecord>,
}

type RecordKey = (String, String);

/// In-process store backed by a sharded concurrent map
pub struct InMemoryLearningStore {
    records: DashMap<RecordKey, LearningRecord>,
    max_retries: u32,
}

impl InMemoryLearningStore {
    pub fn new(max_retries: u32) -> Self {
        Self {
            records: DashMap::new(),
            max_retries: max_retries.max(1),
        }
    }

    /// Seed a store from existing records
    pub fn from_records(records: Vec<LearningRecord>, max_retries: u32) -> Self {
        let store = Self::new(max_retries);
        store.insert_all(records);
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert_all(&self, records: Vec<LearningRecord>) -> usize {
        let count = records.len();
        for record in records {
            self.records
                .insert((record.domain.clone(), record.persona.clone()), record);
        }
        count
    }

    /// Write all records to `path` as JSON
    pub async fn save_snapshot(&self, path: &Path) -> Result<usize, LearningError> {
        let snapshot = LearningSnapshot {
            taken_at: Utc::now(),
            records: self.snapshot(),
        };
        let count = snapshot.records.len();
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json)
            .await
            .map_err(|source| LearningError::Snapshot {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Saved {} learning records to {}", count, path.display());
        Ok(count)
    }

    /// Merge records from a snapshot file, replacing matching keys
    pub async fn load_snapshot(&self, path: &Path) -> Result<usize, LearningError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| LearningError::Snapshot {
                path: path.to_path_buf(),
                source,
            })?;
        let snapshot: LearningSnapshot = serde_json::from_str(&raw)?;
        let count = self.insert_all(snapshot.records);
        info!(
            "Loaded {} learning records from {} (taken {})",
            count,
            path.display(),
            snapshot.taken_at.to_rfc3339()
        );
        Ok(count)
    }
}

impl Default for InMemoryLearningStore {
    fn default() -> Self {
        Self::new(super::engine::default_max_retries())
    }
}

impl LearningStore for InMemoryLearningStore {
    fn record_outcome(
        &self,
        domain: &str,
        persona: &str,
        success: bool,
    ) -> Result<LearningRecord, LearningError> {
        let key = (domain.to_string(), persona.to_string());
        for attempt in 1..=self.max_retries {
            if let Some(entry) = self.records.try_entry(key.clone()) {
                let mut record = entry.or_insert_with(|| LearningRecord::new(domain, persona));
                record.record(success);
                return Ok(record.clone());
            }
            debug!(
                "Learning record ({}, {}) busy, attempt {}/{}",
                domain, persona, attempt, self.max_retries
            );
            std::thread::yield_now();
        }
        Err(LearningError::Contention {
            domain: domain.to_string(),
            persona: persona.to_string(),
            attempts: self.max_retries,
        })
    }

    fn get(&self, domain: &str, persona: &str) -> Option<LearningRecord> {
        self.records
            .get(&(domain.to_string(), persona.to_string()))
            .map(|r| r.value().clone())
    }

    fn records_for_domain(&self, domain: &str) -> Vec<LearningRecord> {
        let mut records: Vec<LearningRecord> = self
            .records
            .iter()
            .filter(|r| r.key().0 == domain)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.persona.cmp(&b.persona));
        records
    }

    fn snapshot(&self) -> Vec<LearningRecord> {
        let mut records: Vec<LearningRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| (&a.domain, &a.persona).cmp(&(&b.domain, &b.persona)));
        records
    }
}
