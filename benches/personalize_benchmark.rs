//! Benchmarks for smartblock evaluation.
//!
//! Run with: cargo bench
//!
//! This benchmark suite measures:
//! - Pipeline throughput for typical page sizes
//! - Source classification with and without the store cache
//! - Scalability with the number of rules

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use smartblock::{
    CustomTrafficSource, EngineConfig, LinkBlock, NoopObserver, RequestSignals, RuleAction,
    RuleBook, RuleCondition, RuleEngine, RuleStore, SmartRule, TrafficClassifier,
};

const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";

/// Generate a page's blocks, every fourth one linking to a platform.
fn generate_blocks(count: usize) -> Vec<LinkBlock> {
    let platforms = ["tiktok.com", "youtube.com", "instagram.com", "example.com"];
    (0..count)
        .map(|i| {
            LinkBlock::with_url(
                format!("b{}", i),
                format!("https://{}/{}", platforms[i % platforms.len()], i),
            )
        })
        .collect()
}

/// Generate rules mixing every action type and condition kind.
fn generate_rules(count: usize, blocks: usize) -> Vec<SmartRule> {
    (0..count)
        .map(|i| {
            let target = format!("b{}", i % blocks.max(1));
            let action = match i % 3 {
                0 => RuleAction::hide([target]),
                1 => RuleAction::reorder([target]),
                _ => RuleAction::show((0..blocks).map(|b| format!("b{}", b))),
            };
            let conditions = match i % 4 {
                0 => RuleCondition::any().sources(["tiktok", "instagram"]),
                1 => RuleCondition::any().devices(["desktop"]),
                2 => RuleCondition::any().between("22:00", "06:00"),
                _ => RuleCondition::any().days([0, 6]),
            };
            SmartRule::new(format!("r{}", i), format!("Rule {}", i), action)
                .with_priority((i % 10) as i64)
                .with_conditions(conditions)
        })
        .collect()
}

fn generate_signals(count: usize) -> Vec<RequestSignals> {
    let referers = [
        "https://www.tiktok.com/@someone",
        "https://l.instagram.com/?u=abc",
        "https://www.google.co.uk/",
        "https://someone.substack.com/p/1",
        "",
    ];
    (0..count)
        .map(|i| {
            RequestSignals::new()
                .referer(referers[i % referers.len()])
                .user_agent(IPHONE)
                .returning(i % 2 == 0)
        })
        .collect()
}

/// Benchmark the full pipeline for one page view.
fn bench_personalize(c: &mut Criterion) {
    let engine = RuleEngine::default().with_observer(NoopObserver);
    let classifier = TrafficClassifier::default();
    let at = Utc.with_ymd_and_hms(2024, 6, 2, 23, 0, 0).unwrap();

    let mut group = c.benchmark_group("personalize");
    for (blocks, rules) in [(10, 5), (30, 20), (100, 50)] {
        let page = generate_blocks(blocks);
        let rule_set = generate_rules(rules, blocks);
        let info = classifier.classify_at(&generate_signals(1)[0], &at);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("blocks_rules", format!("{}x{}", blocks, rules)),
            &(page, rule_set),
            |b, (page, rule_set)| {
                b.iter(|| black_box(engine.personalize(page, rule_set, &info, &[])))
            },
        );
    }
    group.finish();
}

/// Benchmark source classification with and without the cache.
fn bench_classify(c: &mut Criterion) {
    let book = RuleBook::new(
        vec![],
        vec![CustomTrafficSource::new("Newsletter", ["substack.com"])],
    );
    let signals = generate_signals(1000);
    let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(signals.len() as u64));

    let uncached = RuleStore::new(book.clone(), EngineConfig::no_cache());
    group.bench_function("no_cache", |b| {
        b.iter(|| {
            for s in &signals {
                black_box(uncached.classify_at(s, &at));
            }
        })
    });

    let cached = RuleStore::new(book, EngineConfig::default());
    for s in &signals {
        let _ = cached.classify_at(s, &at);
    }
    group.bench_function("cache_hit", |b| {
        b.iter(|| {
            for s in &signals {
                black_box(cached.classify_at(s, &at));
            }
        })
    });

    group.finish();
}

/// Benchmark scalability with different rule counts.
fn bench_scalability(c: &mut Criterion) {
    let engine = RuleEngine::default().with_observer(NoopObserver);
    let page = generate_blocks(30);
    let info = TrafficClassifier::default().classify_at(
        &generate_signals(1)[0],
        &Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap(),
    );

    let mut group = c.benchmark_group("scalability");
    for size in [10, 100, 1_000].iter() {
        let rules = generate_rules(*size, page.len());
        group.bench_with_input(BenchmarkId::new("rules", size), size, |b, _| {
            b.iter(|| black_box(engine.personalize(&page, &rules, &info, &[])))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_personalize, bench_classify, bench_scalability);
criterion_main!(benches);
