//! Entity store benchmarks.
//!
//! Measures the per-frame costs the runtime pays: a signature scan over a
//! populated world, a draining edge poll, and attach/detach churn that feeds
//! tracked queries.
//!
//! Run with: `cargo bench --bench ecs_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vela_ecs::prelude::*;

#[derive(Debug, Clone)]
struct Transform([f64; 3]);

#[derive(Debug, Clone)]
struct Velocity([f64; 3]);

#[derive(Debug, Clone)]
struct Collider(f64);

fn populated_world(entity_count: usize) -> (World, Vec<EntityId>) {
    let mut world = World::new();
    world.register_component::<Transform>("transform");
    world.register_component::<Velocity>("velocity");
    world.register_component::<Collider>("collider");

    let entities = (0..entity_count)
        .map(|i| {
            let e = world.spawn();
            world.insert_component(e, Transform([i as f64, 0.0, 0.0])).unwrap();
            if i % 2 == 0 {
                world.insert_component(e, Velocity([1.0, 0.0, 0.0])).unwrap();
            }
            if i % 3 == 0 {
                world.insert_component(e, Collider(0.5)).unwrap();
            }
            e
        })
        .collect();
    (world, entities)
}

fn bench_query_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_scan");
    for &count in &[1_000usize, 10_000] {
        let (world, _) = populated_world(count);
        let movers = world.signature::<(Transform, Velocity)>();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(world.query(&movers).count()));
        });
    }
    group.finish();
}

fn bench_integrate(c: &mut Criterion) {
    let (mut world, _) = populated_world(10_000);
    let movers = world.signature::<(Transform, Velocity)>();
    c.bench_function("integrate_10k", |b| {
        b.iter(|| {
            let ids: Vec<EntityId> = world.query(&movers).collect();
            for e in ids {
                let v = world.get_component::<Velocity>(e).map(|v| v.0);
                if let (Some(v), Some(t)) = (v, world.get_component_mut::<Transform>(e)) {
                    t.0[0] += v[0] / 60.0;
                }
            }
        });
    });
}

fn bench_edge_churn(c: &mut Criterion) {
    let (mut world, entities) = populated_world(10_000);
    let physical = world.signature::<(Transform, Collider)>();
    world.track(&physical);
    c.bench_function("collider_churn_1k", |b| {
        b.iter(|| {
            for e in entities.iter().take(1_000) {
                world.remove_component::<Collider>(*e).unwrap();
            }
            black_box(world.query_exited(&physical).len());
            for e in entities.iter().take(1_000) {
                world.insert_component(*e, Collider(0.5)).unwrap();
            }
            black_box(world.query_entered(&physical).len());
        });
    });
}

criterion_group!(benches, bench_query_scan, bench_integrate, bench_edge_churn);
criterion_main!(benches);
