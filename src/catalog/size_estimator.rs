//! Size cost estimation for catalog entries that do not declare one

use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

use super::CatalogError;

/// Estimates the size cost of instruction content
pub trait SizeEstimator: Send + Sync {
    /// Estimate the cost of the given text
    fn estimate(&self, text: &str) -> u32;

    /// Estimate costs for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<u32> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Tiktoken-based estimator using cl100k_base
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    pub fn new() -> Result<Self, CatalogError> {
        let bpe = cl100k_base().map_err(|e| CatalogError::Estimator(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl SizeEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> u32 {
        let tokens = self.bpe.encode_with_special_tokens(text).len();
        u32::try_from(tokens).unwrap_or(u32::MAX)
    }
}

/// Word-based estimator (~1.3 tokens per word)
pub struct WordBasedEstimator {
    tokens_per_word: f64,
}

impl WordBasedEstimator {
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }
}

impl Default for WordBasedEstimator {
    fn default() -> Self {
        Self::new(1.3)
    }
}

impl SizeEstimator for WordBasedEstimator {
    fn estimate(&self, text: &str) -> u32 {
        let word_count = text.split_whitespace().count();
        let estimate = (word_count as f64 * self.tokens_per_word).ceil();
        if estimate >= u32::MAX as f64 {
            u32::MAX
        } else {
            estimate as u32
        }
    }
}

/// Pick an estimator by name; unknown names fall back to word counting
pub fn estimator_for(name: &str) -> Result<Arc<dyn SizeEstimator>, CatalogError> {
    match name {
        "tiktoken" => Ok(Arc::new(TiktokenEstimator::new()?)),
        _ => Ok(Arc::new(WordBasedEstimator::default())),
    }
}
