//! Deterministic signal extraction from request text and file paths

use glob::Pattern;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// Lower-cased, tokenised request text
#[derive(Debug, Clone)]
pub struct TextSignals {
    /// Tokens joined by single spaces and padded on both ends
    padded: String,
    word_count: usize,
}

impl TextSignals {
    pub fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let word_count = tokens.len();
        Self {
            padded: format!(" {} ", tokens.join(" ")),
            word_count,
        }
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn contains(&self, keyword: &NormalizedKeyword) -> bool {
        self.padded.contains(keyword.padded.as_str())
    }

    /// Number of distinct keywords present in the text
    pub fn count_hits(&self, keywords: &[NormalizedKeyword]) -> usize {
        keywords.iter().filter(|k| self.contains(k)).count()
    }
}

/// Keyword or phrase normalised the same way as request text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NormalizedKeyword {
    padded: String,
}

impl NormalizedKeyword {
    pub fn as_str(&self) -> &str {
        self.padded.trim()
    }
}

/// Normalise and de-duplicate a keyword list, dropping blanks
pub fn normalize_keywords(keywords: &[String]) -> Vec<NormalizedKeyword> {
    let unique: BTreeSet<NormalizedKeyword> = keywords
        .iter()
        .map(|k| tokenize(k))
        .filter(|tokens| !tokens.is_empty())
        .map(|tokens| NormalizedKeyword {
            padded: format!(" {} ", tokens.join(" ")),
        })
        .collect();
    unique.into_iter().collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Compiled glob patterns plus an extension set
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    patterns: Vec<Pattern>,
    extensions: BTreeSet<String>,
}

impl PathMatcher {
    /// Compile patterns; invalid ones are logged and skipped
    pub fn new(patterns: &[String], extensions: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Skipping invalid path pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        let extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            patterns,
            extensions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.extensions.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if path.is_empty() {
            return false;
        }
        if let Some(ext) = Path::new(&path).extension().and_then(|e| e.to_str()) {
            if self.extensions.contains(&ext.to_lowercase()) {
                return true;
            }
        }
        self.patterns.iter().any(|p| p.matches(&path))
    }

    /// Number of paths this matcher accepts
    pub fn count_matches<'a, I>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths.into_iter().filter(|p| self.matches(p)).count()
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(items: &[&str]) -> Vec<NormalizedKeyword> {
        let owned: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        normalize_keywords(&owned)
    }

    #[test]
    fn test_single_word_hits() {
        let text = TextSignals::new("Fix SQL injection in login handler");
        assert_eq!(text.word_count(), 6);
        assert_eq!(text.count_hits(&keywords(&["injection", "login", "xss"])), 2);
    }

    #[test]
    fn test_phrase_hits_respect_word_boundaries() {
        let text = TextSignals::new("possible sql-injection, please check");
        assert_eq!(text.count_hits(&keywords(&["sql injection"])), 1);

        let text = TextSignals::new("testing the authentication flow");
        // "test" must not match inside "testing"
        assert_eq!(text.count_hits(&keywords(&["test", "auth"])), 0);
    }

    #[test]
    fn test_duplicate_keywords_count_once() {
        let text = TextSignals::new("deploy deploy deploy");
        assert_eq!(text.count_hits(&keywords(&["deploy", "Deploy", " deploy "])), 1);
    }

    #[test]
    fn test_path_matcher_globs_and_extensions() {
        let matcher = PathMatcher::new(
            &["auth/**".to_string(), "**/auth/**".to_string()],
            &[".pem".to_string()],
        );
        assert!(matcher.matches("auth/login.py"));
        assert!(matcher.matches("./services/auth/token.rs"));
        assert!(matcher.matches("certs/server.PEM"));
        assert!(!matcher.matches("src/main.rs"));
        assert!(!matcher.matches(""));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let matcher = PathMatcher::new(&["[".to_string()], &[]);
        assert!(matcher.is_empty());
        assert!(!matcher.matches("anything"));
    }

    #[test]
    fn test_count_matches() {
        let matcher = PathMatcher::new(&[], &["rs".to_string()]);
        let paths = ["a.rs", "b.py", "c/d.rs"];
        assert_eq!(matcher.count_matches(paths.iter().copied()), 2);
    }
}
