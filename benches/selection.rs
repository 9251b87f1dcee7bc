use context_orchestrator::catalog::{Catalog, InstructionEntry, InstructionType};
use context_orchestrator::detection::{ChangeKind, ContextDetector, FileRef, Request};
use context_orchestrator::orchestration::InstructionOrchestrator;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const CATALOG_SIZES: &[usize] = &[100, 1_000, 10_000];
const DOMAINS: &[&str] = &[
    "security",
    "infrastructure",
    "database",
    "development",
    "testing",
    "documentation",
];

fn build_catalog(size: usize) -> Catalog {
    let mut entries = vec![
        InstructionEntry::new("core-rules", "core/rules.md", InstructionType::Core, 300),
        InstructionEntry::new("core-style", "core/style.md", InstructionType::Core, 200),
    ];
    for i in 0..size {
        let domain = DOMAINS[i % DOMAINS.len()];
        entries.push(
            InstructionEntry::new(
                format!("{}-{}", domain, i),
                format!("domains/{}/{}.md", domain, i),
                InstructionType::Domain,
                50 + (i % 7) as u32 * 40,
            )
            .with_tags([domain.to_string(), format!("technique:t{}", i % 5)]),
        );
    }
    Catalog::build(entries, None)
}

fn bench_request() -> Request {
    Request::new("fix sql injection in login handler and add regression tests")
        .with_file(FileRef::new("src/auth/login.rs", ChangeKind::Modified).with_lines_changed(120))
        .with_file(FileRef::new("tests/auth_test.rs", ChangeKind::Added).with_lines_changed(80))
}

fn bench_detect(c: &mut Criterion) {
    let detector = ContextDetector::with_defaults();
    let request = bench_request();
    c.bench_function("detect", |b| b.iter(|| detector.detect(&request)));
}

fn bench_select(c: &mut Criterion) {
    let detector = ContextDetector::with_defaults();
    let orchestrator = InstructionOrchestrator::default();
    let context = detector.detect(&bench_request());

    let mut group = c.benchmark_group("select");
    for &size in CATALOG_SIZES {
        let catalog = build_catalog(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| orchestrator.select(&context, catalog, 8_000))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect, bench_select);
criterion_main!(benches);
