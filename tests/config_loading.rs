//! Configuration loading and engine initialization

use context_orchestrator::prelude::*;
use context_orchestrator::{init_engine, EngineError};
use std::fs;
use std::path::PathBuf;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("orchestrator-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_file_then_environment_layering() {
    let dir = temp_dir();
    let path = dir.join("engine.toml");
    fs::write(
        &path,
        r#"
        [budget]
        max_total = 3000

        [gate]
        confidence_floor = 0.65
        traceability_domains = ["security"]

        [risk.thresholds]
        medium = 2.5
        high = 5.0
        critical = 7.5
        "#,
    )
    .unwrap();

    let config = EngineConfig::load(Some(&path)).unwrap();
    assert_eq!(config.budget.max_total, 3000);
    assert_eq!(config.gate.confidence_floor, 0.65);
    assert_eq!(config.gate.traceability_domains, vec!["security"]);
    assert_eq!(config.risk.thresholds.critical, 7.5);
    // untouched sections keep their defaults
    assert_eq!(config.learning.min_samples, 5);
    assert_eq!(config.detector.domains.len(), 6);

    std::env::set_var("ORCHESTRATOR__BUDGET__MAX_TOTAL", "1500");
    let overridden = EngineConfig::load(Some(&path));
    std::env::remove_var("ORCHESTRATOR__BUDGET__MAX_TOTAL");
    assert_eq!(overridden.unwrap().budget.max_total, 1500);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_file_values_rejected() {
    let dir = temp_dir();
    let path = dir.join("bad.toml");
    fs::write(
        &path,
        r#"
        [risk.thresholds]
        medium = 7.0
        high = 5.0
        critical = 8.0
        "#,
    )
    .unwrap();

    let result = EngineConfig::load(Some(&path));
    assert!(matches!(result, Err(EngineError::Configuration(_))));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_file_rejected() {
    let result = EngineConfig::load(Some(std::path::Path::new("/nonexistent/engine.toml")));
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}

#[test]
fn test_init_engine_loads_catalog_and_snapshot() {
    let dir = temp_dir();
    fs::create_dir_all(dir.join("core")).unwrap();
    fs::write(dir.join("core/rules.md"), "Always keep changes small and reviewed").unwrap();
    fs::write(
        dir.join("catalog.json"),
        r#"[
            {"id": "core-rules", "path": "core/rules.md", "type": "core"},
            {"id": "docs", "path": "domains/docs.md", "type": "domain", "tags": ["documentation"], "size_cost": 120}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("learning.json"),
        r#"{"taken_at": "2026-01-05T10:00:00Z", "records": [
            {"domain": "documentation", "persona": "technical-writer",
             "success_count": 4, "total_count": 5, "last_updated": "2026-01-05T09:59:00Z"}
        ]}"#,
    )
    .unwrap();

    let mut config = EngineConfig::default();
    config.catalog.source_path = Some(dir.join("catalog.json").to_string_lossy().to_string());
    config.catalog.content_root = Some(dir.to_string_lossy().to_string());
    config.catalog.verify_paths = true;
    config.learning.snapshot_path = Some(dir.join("learning.json").to_string_lossy().to_string());

    let engine = tokio_test::block_on(init_engine(config)).unwrap();

    // docs.md does not exist under the content root
    let catalog = engine.catalog();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("core-rules").map(|e| e.size_cost), Some(8));
    assert_eq!(catalog.excluded().len(), 1);

    let record = engine
        .learning()
        .store()
        .get("documentation", "technical-writer")
        .unwrap();
    assert_eq!(record.total_count, 5);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_init_engine_fails_on_unreadable_catalog() {
    let mut config = EngineConfig::default();
    config.catalog.source_path = Some("/nonexistent/catalog.json".to_string());
    let result = tokio_test::block_on(init_engine(config));
    assert!(result.is_err());
}
