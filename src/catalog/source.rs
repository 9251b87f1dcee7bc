//! Catalog feeds and loading

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::index::Catalog;
use super::models::{CatalogRecord, ExcludedEntry, InstructionEntry};
use super::size_estimator::SizeEstimator;
use super::CatalogError;

/// Supplier of catalog records
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Fetch the full set of records
    async fn fetch(&self) -> Result<Vec<CatalogRecord>, CatalogError>;
}

/// JSON file containing an array of catalog records
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;
        let records: Vec<CatalogRecord> = serde_json::from_str(&raw)?;
        debug!("Read {} catalog records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

/// In-memory records, mostly for embedding callers and tests
pub struct StaticCatalogSource {
    records: Vec<CatalogRecord>,
}

impl StaticCatalogSource {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }

    pub fn from_entries(entries: Vec<InstructionEntry>) -> Self {
        Self::new(entries.into_iter().map(CatalogRecord::from).collect())
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        Ok(self.records.clone())
    }
}

/// Resolves records into entries and builds the indexed catalog
pub struct CatalogLoader {
    estimator: Arc<dyn SizeEstimator>,
    content_root: Option<PathBuf>,
    verify_paths: bool,
}

impl CatalogLoader {
    pub fn new(
        estimator: Arc<dyn SizeEstimator>,
        content_root: Option<PathBuf>,
        verify_paths: bool,
    ) -> Self {
        Self {
            estimator,
            content_root,
            verify_paths,
        }
    }

    /// Fetch from a source and build a catalog
    pub async fn load(&self, source: &dyn CatalogSource) -> Result<Catalog, CatalogError> {
        let records = source.fetch().await?;
        let fetched = records.len();
        let (entries, unresolved) = self.resolve(records).await;

        let root = if self.verify_paths {
            self.content_root.as_deref()
        } else {
            None
        };
        let mut catalog = Catalog::build(entries, root);
        catalog.record_exclusions(unresolved);

        info!(
            "Loaded catalog from {} source: {} records, {} usable, {} excluded",
            source.name(),
            fetched,
            catalog.len(),
            catalog.excluded().len()
        );
        Ok(catalog)
    }

    /// Fill in missing size costs from the entry content
    pub async fn resolve(
        &self,
        records: Vec<CatalogRecord>,
    ) -> (Vec<InstructionEntry>, Vec<ExcludedEntry>) {
        let mut entries = Vec::with_capacity(records.len());
        let mut unresolved = Vec::new();

        for mut record in records {
            if record.size_cost.is_none() {
                match self.estimate_cost(&record.path).await {
                    Ok(cost) => record.size_cost = Some(cost),
                    Err(reason) => {
                        warn!(
                            "Excluding catalog entry id='{}': cannot determine size cost ({})",
                            record.id, reason
                        );
                        unresolved.push(ExcludedEntry {
                            id: record.id,
                            path: record.path,
                            reason,
                        });
                        continue;
                    }
                }
            }
            if let Some(entry) = record.into_entry() {
                entries.push(entry);
            }
        }

        (entries, unresolved)
    }

    async fn estimate_cost(&self, path: &str) -> Result<u32, String> {
        let root = self
            .content_root
            .as_deref()
            .ok_or_else(|| "no size_cost and no content root configured".to_string())?;
        let full = root.join(Path::new(path));
        let content = fs::read_to_string(&full)
            .await
            .map_err(|e| format!("cannot read {}: {}", full.display(), e))?;
        Ok(self.estimator.estimate(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::InstructionType;
    use crate::catalog::size_estimator::WordBasedEstimator;

    fn loader(root: Option<PathBuf>) -> CatalogLoader {
        CatalogLoader::new(Arc::new(WordBasedEstimator::default()), root, false)
    }

    #[tokio::test]
    async fn test_static_source_roundtrip() {
        let source = StaticCatalogSource::from_entries(vec![InstructionEntry::new(
            "core",
            "core.md",
            InstructionType::Core,
            10,
        )]);
        let catalog = loader(None).load(&source).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.excluded().is_empty());
    }

    #[tokio::test]
    async fn test_missing_cost_is_estimated_from_content() {
        let root = std::env::temp_dir().join(format!("catalog-src-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).await.unwrap();
        fs::write(root.join("guide.md"), "one two three").await.unwrap();

        let records = vec![
            CatalogRecord {
                id: "guide".to_string(),
                path: "guide.md".to_string(),
                kind: InstructionType::Domain,
                tags: Default::default(),
                size_cost: None,
            },
            CatalogRecord {
                id: "ghost".to_string(),
                path: "ghost.md".to_string(),
                kind: InstructionType::Domain,
                tags: Default::default(),
                size_cost: None,
            },
        ];
        let catalog = loader(Some(root.clone()))
            .load(&StaticCatalogSource::new(records))
            .await
            .unwrap();

        assert_eq!(catalog.get("guide").map(|e| e.size_cost), Some(4));
        assert!(catalog.get("ghost").is_none());
        assert_eq!(catalog.excluded().len(), 1);

        fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_source_reads_json() {
        let path = std::env::temp_dir().join(format!("catalog-{}.json", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"[{"id":"core","path":"core.md","type":"core","size_cost":50},
                {"id":"sec","path":"sec.md","type":"domain","tags":["security"],"size_cost":70}]"#,
        )
        .await
        .unwrap();

        let catalog = loader(None).load(&FileCatalogSource::new(&path)).await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tagged("security").len(), 1);

        fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_source_missing_file_errors() {
        let source = FileCatalogSource::new("/nonexistent/catalog.json");
        let result = loader(None).load(&source).await;
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
