//! Benchmarks for the delta engine.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use schema_delta::model::{ObjectDocument, ObjectKind, Schema, SchemaDocument};
use schema_delta::{DeltaConfig, DeltaEngine, DiffContext, MatchingStrategy, TextCompiler};
use std::hint::black_box;

/// `types` object types with four properties each. Every fifth type is
/// renamed in the `renamed` variant and every seventh gains a property.
fn snapshot(types: usize, renamed: bool) -> Schema {
    let mut doc = SchemaDocument::new().with_std().module("default");
    for i in 0..types {
        let name = if renamed && i % 5 == 0 {
            format!("default::Entity{i}Renamed")
        } else {
            format!("default::Entity{i}")
        };
        doc = doc.object(ObjectDocument::new(ObjectKind::ObjectType, name.as_str()).base("std::Object"));
        let mut props = vec![
            ("title", "std::str"),
            ("count", "std::int64"),
            ("ratio", "std::float64"),
            ("active", "std::bool"),
        ];
        if renamed && i % 7 == 0 {
            props.push(("extra", "std::uuid"));
        }
        for (prop, target) in props {
            doc = doc.object(
                ObjectDocument::new(ObjectKind::Property, format!("{name}.{prop}"))
                    .base("std::property")
                    .target(target),
            );
        }
    }
    Schema::from_document(&doc, &TextCompiler::default()).expect("benchmark snapshot")
}

fn bench_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta_schemas");
    for types in [10, 50, 200] {
        let old = snapshot(types, false);
        let new = snapshot(types, true);

        for strategy in [MatchingStrategy::Greedy, MatchingStrategy::Optimal] {
            let engine = DeltaEngine::new().with_config(DeltaConfig::default().with_strategy(strategy));
            group.bench_with_input(BenchmarkId::new(strategy.to_string(), types), &types, |b, _| {
                b.iter(|| {
                    let mut ctx = DiffContext::new();
                    black_box(engine.delta_schemas(&old, &new, &mut ctx))
                });
            });
        }
    }
    group.finish();
}

fn bench_identical(c: &mut Criterion) {
    let old = snapshot(200, false);
    let new = snapshot(200, false);
    let engine = DeltaEngine::new();
    c.bench_function("delta_schemas/identical_200", |b| {
        b.iter(|| {
            let mut ctx = DiffContext::new();
            black_box(engine.delta_schemas(&old, &new, &mut ctx))
        });
    });
}

criterion_group!(benches, bench_delta, bench_identical);
criterion_main!(benches);
