//! Benchmarks for observation, path resolution and notification fan-out.
//!
//! Run with: cargo bench --package reflex-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflex_core::{make_reactive, path, watch, Watcher};
use serde_json::{json, Value};

/// Generate a flat document with N fields
fn generate_flat_doc(num_fields: usize) -> Value {
    let mut obj = serde_json::Map::new();
    for i in 0..num_fields {
        obj.insert(format!("field_{}", i), json!(i));
    }
    Value::Object(obj)
}

/// Generate a deeply nested document
fn generate_nested_doc(depth: usize) -> Value {
    let mut current = json!({"value": 42});
    for _ in 0..depth {
        current = json!({ "next": current });
    }
    current
}

fn bench_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_flat_doc");

    for size in [10, 100, 1000] {
        let doc = generate_flat_doc(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| make_reactive(black_box(doc.clone())))
        });
    }

    group.finish();
}

fn bench_resolve_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_nested_path");

    for depth in [1, 8, 32] {
        let state = make_reactive(generate_nested_doc(depth));
        let source = std::iter::repeat("next")
            .take(depth)
            .chain(["value"])
            .collect::<Vec<_>>()
            .join(".");
        let compiled = path::compile(&source).expect("generated path compiles");

        group.bench_with_input(BenchmarkId::from_parameter(depth), &compiled, |b, compiled| {
            b.iter(|| compiled.resolve(black_box(&state)))
        });
    }

    group.finish();
}

fn bench_notify_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify_fan_out");

    for watchers in [1, 10, 100] {
        let state = make_reactive(json!({"counter": 0}));
        let root = state.as_object().cloned().expect("object");
        let _watchers: Vec<Watcher> = (0..watchers)
            .map(|_| watch(&state, "counter", |_, _| {}).expect("valid path"))
            .collect();

        let mut next = 0u64;
        group.bench_function(BenchmarkId::from_parameter(watchers), |b| {
            b.iter(|| {
                next += 1;
                root.set("counter", next);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_observe, bench_resolve_path, bench_notify_fan_out);
criterion_main!(benches);
