//! Atomically swappable catalog handle

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use super::index::Catalog;
use super::models::InstructionEntry;
use crate::metrics::METRICS;

/// Shared handle to the active catalog
///
/// Readers take an `Arc` snapshot and never observe a partially built catalog;
/// a reload builds the new index first and only then swaps the pointer.
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
    content_root: Option<PathBuf>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
            content_root: None,
        }
    }

    /// Verify entry paths below `root` on every reload
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = Some(root.into());
        self
    }

    pub fn empty() -> Self {
        Self::new(Catalog::default())
    }

    /// Current catalog snapshot
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild the index from a new feed and swap it in
    pub fn reload(&self, entries: Vec<InstructionEntry>) -> Arc<Catalog> {
        let catalog = Catalog::build(entries, self.content_root.as_deref());
        self.install(catalog)
    }

    /// Swap in an already built catalog
    pub fn install(&self, catalog: Catalog) -> Arc<Catalog> {
        let catalog = Arc::new(catalog);
        METRICS.record_catalog_reload(catalog.len(), catalog.excluded().len());

        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, catalog.clone())
        };

        info!(
            "Catalog swapped: {} -> {} ({} entries)",
            short(previous.fingerprint()),
            short(catalog.fingerprint()),
            catalog.len()
        );
        catalog
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::empty()
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
