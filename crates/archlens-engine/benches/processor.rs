use archlens_core::config::{CycleConfig, ProcessorConfig};
use archlens_core::{DependencyCategory, NormalizedRecord, PathRecord, RawNode, RawRelationship};
use archlens_engine::graph::normalize::{dedupe_longest_paths, split_into_chunks};
use archlens_engine::violations::find_cycles;
use archlens_engine::{FullGraph, GraphProcessor, Hierarchy};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const CONTAINS: &str = "CONTAINS";

struct Tier {
    name: &'static str,
    layers: usize,
    modules_per_layer: usize,
    edges: usize,
}

const TIERS: [Tier; 3] = [
    Tier {
        name: "small",
        layers: 4,
        modules_per_layer: 8,
        edges: 100,
    },
    Tier {
        name: "medium",
        layers: 12,
        modules_per_layer: 25,
        edges: 1_500,
    },
    Tier {
        name: "large",
        layers: 30,
        modules_per_layer: 60,
        edges: 12_000,
    },
];

struct Corpus {
    hierarchy: Hierarchy,
    records: Vec<NormalizedRecord>,
}

fn contains(parent: &RawNode, child: &RawNode) -> PathRecord {
    let mut record = PathRecord::new(
        parent.clone(),
        vec![RawRelationship::new(
            format!("c:{}:{}", parent.element_id, child.element_id),
            CONTAINS,
            parent.element_id.clone(),
            child.element_id.clone(),
        )],
        child.clone(),
    );
    record.nodes = vec![parent.clone(), child.clone()];
    record
}

/// One domain and application, `layers` layers, and seeded pseudo-random
/// dependencies between modules.
fn generate(tier: &Tier, seed: u64) -> Corpus {
    let domain = RawNode::new("domain", &["Domain"]);
    let app = RawNode::new("app", &["Application"]);
    let mut raw = vec![contains(&domain, &app)];
    let mut modules = Vec::new();

    for l in 0..tier.layers {
        let layer = RawNode::new(format!("layer{l}"), &["Layer"]);
        raw.push(contains(&app, &layer));
        for m in 0..tier.modules_per_layer {
            let module = RawNode::new(format!("layer{l}.mod{m}"), &["Module"]);
            raw.push(contains(&layer, &module));
            modules.push(module);
        }
    }

    let mut state = seed;
    let mut next = |bound: usize| {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        usize::try_from(state >> 33).unwrap_or(0) % bound
    };
    let categories = [
        DependencyCategory::Weak,
        DependencyCategory::Strong,
        DependencyCategory::Entity,
    ];
    for e in 0..tier.edges {
        let from = &modules[next(modules.len())];
        let to = &modules[next(modules.len())];
        let category = categories[next(categories.len())];
        raw.push(PathRecord::new(
            from.clone(),
            vec![
                RawRelationship::new(
                    format!("e{e}"),
                    "DEPENDS_ON",
                    from.element_id.clone(),
                    to.element_id.clone(),
                )
                .with_category(category),
            ],
            to.clone(),
        ));
    }

    let records = dedupe_longest_paths(split_into_chunks(&raw, CONTAINS));
    let hierarchy = Hierarchy::build(&raw, &records, CONTAINS);
    Corpus { hierarchy, records }
}

fn bench_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("processor.tiered");

    for tier in &TIERS {
        let corpus = generate(tier, 0xA5C4_1E25_u64 + tier.edges as u64);
        group.throughput(Throughput::Elements(tier.edges as u64));

        for (label, max_depth) in [("full", None), ("layers", Some(2))] {
            let config = ProcessorConfig {
                max_depth,
                ..ProcessorConfig::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("process.{label}"), tier.name),
                &corpus,
                |b, corpus| {
                    b.iter(|| {
                        black_box(
                            GraphProcessor::new(&corpus.hierarchy, &config).process(&corpus.records),
                        )
                    });
                },
            );
        }

        group.bench_with_input(BenchmarkId::new("cycles", tier.name), &corpus, |b, corpus| {
            let full = FullGraph::from_records(&corpus.records);
            let bounds = CycleConfig {
                max_depth: 8,
                max_cycles: 1_000,
            };
            b.iter(|| black_box(find_cycles(&full, bounds)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_processor);
criterion_main!(benches);
