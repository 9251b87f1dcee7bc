//! Shared engine under concurrent requests, feedback and reloads

use context_orchestrator::catalog::CatalogHandle;
use context_orchestrator::learning::{InMemoryLearningStore, LearningStore};
use context_orchestrator::prelude::*;
use std::sync::Arc;
use std::thread;

fn catalog_entries(extra: usize) -> Vec<InstructionEntry> {
    let mut entries = vec![
        InstructionEntry::new("core", "core.md", InstructionType::Core, 100),
        InstructionEntry::new("docs", "docs.md", InstructionType::Domain, 100)
            .with_tags(["documentation"]),
    ];
    for i in 0..extra {
        entries.push(
            InstructionEntry::new(format!("extra-{}", i), format!("extra/{}.md", i), InstructionType::Domain, 10)
                .with_tags(["documentation"]),
        );
    }
    entries
}

#[test]
fn test_parallel_processing_feedback_and_reload() {
    let store = Arc::new(InMemoryLearningStore::new(100_000));
    let engine = Arc::new(InstructionEngine::new(
        EngineConfig::default(),
        CatalogHandle::new(Catalog::build(catalog_entries(0), None)),
        store.clone(),
    ));

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut recorded = 0u64;
                for n in 0..200 {
                    let execution = engine.process(&Request::new("update the readme guide"));
                    assert!(execution.proceed);
                    assert!(!execution.fallback);
                    // either catalog generation, never a mix
                    let count = execution.instructions.len();
                    assert!(count == 2 || count == 5, "saw {} instructions", count);
                    if engine.record_execution(&execution, (i + n) % 3 != 0).is_some() {
                        recorded += 1;
                    }
                }
                recorded
            })
        })
        .collect();

    let reloader = {
        let engine = engine.clone();
        thread::spawn(move || {
            for round in 0..40 {
                engine.reload(catalog_entries(if round % 2 == 0 { 3 } else { 0 }));
            }
        })
    };

    let recorded: u64 = workers.into_iter().map(|w| w.join().unwrap()).sum();
    reloader.join().unwrap();

    let record = store.get("documentation", "technical-writer").unwrap();
    assert_eq!(record.total_count, recorded);
    assert_eq!(recorded, 1_200);
}
