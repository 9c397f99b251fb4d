// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the Strongbox marshaler and backends

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::BTreeMap;
use tokio::runtime::Runtime;

use strongbox_core::{marshal, unmarshal, InMemoryBackend, Persist, StorageEngine};
use strongbox_storage::{JsonFileBackend, YamlFileBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Persist)]
enum Rank {
    Member,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Persist)]
struct Position {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, PartialEq, Persist)]
struct Profile {
    #[persist(id)]
    id: String,
    points: i64,
    rank: Rank,
    tags: Vec<String>,
    home: Option<Position>,
    route: Vec<Position>,
    counters: BTreeMap<String, i64>,
}

fn profile(i: usize, route_len: usize) -> Profile {
    Profile {
        id: format!("profile-{i}"),
        points: i as i64,
        rank: if i % 2 == 0 { Rank::Member } else { Rank::Admin },
        tags: vec!["alpha".to_string(), "beta".to_string(), format!("t{i}")],
        home: Some(Position {
            x: i as f64,
            y: -(i as f64),
        }),
        route: (0..route_len)
            .map(|j| Position {
                x: j as f64,
                y: (j * 2) as f64,
            })
            .collect(),
        counters: (0..4).map(|j| (format!("c{j}"), j as i64)).collect(),
    }
}

// ============================================================================
// Marshaling Benchmarks
// ============================================================================

fn bench_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal");

    for route_len in [0, 16, 256] {
        let object = profile(1, route_len);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("marshal", route_len),
            &object,
            |b, object| b.iter(|| black_box(marshal(object).unwrap())),
        );

        let marshaled = marshal(&object).unwrap();
        group.bench_with_input(
            BenchmarkId::new("unmarshal", route_len),
            &marshaled,
            |b, marshaled| {
                b.iter(|| {
                    black_box(
                        unmarshal::<Profile>(marshaled.record.clone(), &marshaled.identifier)
                            .unwrap(),
                    )
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Backend Benchmarks
// ============================================================================

fn bench_save_and_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engines = [
        ("memory", StorageEngine::new(InMemoryBackend::new())),
        (
            "json",
            StorageEngine::new(JsonFileBackend::new(dir.path().join("json"))),
        ),
        (
            "yaml",
            StorageEngine::new(YamlFileBackend::new(dir.path().join("yaml"))),
        ),
    ];

    let mut group = c.benchmark_group("engine");
    let object = profile(7, 16);

    for (name, engine) in &engines {
        group.bench_function(BenchmarkId::new("save", name), |b| {
            b.iter(|| engine.save_or_update_sync(black_box(&object)).unwrap())
        });

        engine.save_or_update_sync(&object).unwrap();
        group.bench_function(BenchmarkId::new("load", name), |b| {
            b.iter(|| black_box(engine.load_by_id_sync::<Profile>("profile-7").unwrap()))
        });
    }

    group.finish();
}

fn bench_load_all(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engine = StorageEngine::new(JsonFileBackend::new(dir.path()));
    for i in 0..200 {
        engine.save_or_update_sync(&profile(i, 4)).unwrap();
    }

    let mut group = c.benchmark_group("load_all");
    group.throughput(Throughput::Elements(200));
    group.bench_function("json_200", |b| {
        b.iter(|| black_box(engine.load_all_sync::<Profile>().unwrap().len()))
    });
    group.finish();
}

fn bench_async_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = StorageEngine::new(InMemoryBackend::new());
    let object = profile(3, 8);

    c.bench_function("async_save_load", |b| {
        b.to_async(&rt).iter(|| async {
            engine.save_or_update_async(object.clone()).await.unwrap();
            black_box(
                engine
                    .load_by_id_async::<Profile>("profile-3")
                    .await
                    .unwrap(),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_marshal,
    bench_save_and_load,
    bench_load_all,
    bench_async_round_trip
);
criterion_main!(benches);
