//! LumaDB Table Engine Benchmarks
//!
//! Insert throughput, point selects through each access path, and the raw
//! B-tree and LRU primitives.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use luma_table::{BTree, Column, ColumnType, IndexKind, LruCache, Predicate, Row, Table, TableOptions, Value};

const SMALL_BATCH: usize = 100;
const MEDIUM_BATCH: usize = 1_000;
const LARGE_BATCH: usize = 10_000;

fn columns() -> Vec<Column> {
    vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("email", ColumnType::String).unique(),
        Column::new("age", ColumnType::Integer),
    ]
}

fn row(i: usize) -> Row {
    Row::new()
        .with("id", i as i64)
        .with("email", format!("user{}@example.com", i))
        .with("age", (i % 60) as i64)
}

fn filled(rows: usize, options: TableOptions) -> Table {
    let mut table = Table::with_options("users", columns(), options).unwrap();
    for i in 0..rows {
        table.insert(row(i)).unwrap();
    }
    table
}

/// Benchmark batched inserts with constraint checks
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [SMALL_BATCH, MEDIUM_BATCH, LARGE_BATCH] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(filled(size, TableOptions::default())))
        });
    }

    group.finish();
}

/// Benchmark one select per access path, bypassing the result cache
fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    let options = TableOptions {
        cache_capacity: 1,
        ..TableOptions::default()
    };

    let mut table = filled(LARGE_BATCH, options);
    table.create_index("age", IndexKind::Hash).unwrap();

    let predicates: Vec<(&str, Predicate)> = vec![
        ("btree_pk", [("id".to_string(), Value::Int(4_321))].into_iter().collect()),
        ("hash_age", [("age".to_string(), Value::Int(42))].into_iter().collect()),
        (
            "scan_email",
            [("email".to_string(), Value::from("user4321@example.com"))]
                .into_iter()
                .collect(),
        ),
    ];

    for (name, predicate) in &predicates {
        let mut alternate = predicate.clone();
        alternate.insert("id".to_string(), Value::Int(-1));
        let mut flip = false;
        // Alternating two keys in a one-slot cache forces a miss every time
        group.bench_function(*name, |b| {
            b.iter(|| {
                flip = !flip;
                let query = if flip { predicate } else { &alternate };
                black_box(table.select(query).unwrap())
            })
        });
    }

    group.bench_function("cached_hit", |b| {
        let cached = filled(MEDIUM_BATCH, TableOptions::default());
        let predicate: Predicate = [("age".to_string(), Value::Int(7))].into_iter().collect();
        cached.select(&predicate).unwrap();
        b.iter(|| black_box(cached.select(&predicate).unwrap()))
    });

    group.finish();
}

/// Benchmark the index and cache building blocks directly
fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    group.throughput(Throughput::Elements(LARGE_BATCH as u64));
    group.bench_function("btree_insert", |b| {
        b.iter(|| {
            let mut tree = BTree::new();
            for i in 0..LARGE_BATCH {
                tree.insert((i * 7_919) % LARGE_BATCH, i);
            }
            black_box(tree.height())
        })
    });

    let mut tree = BTree::new();
    for i in 0..LARGE_BATCH {
        tree.insert(i, i);
    }
    group.throughput(Throughput::Elements(1));
    group.bench_function("btree_search", |b| b.iter(|| black_box(tree.search(&black_box(5_000)))));

    let cache = LruCache::new(MEDIUM_BATCH);
    for i in 0..MEDIUM_BATCH {
        cache.set(i, i);
    }
    group.bench_function("lru_get", |b| b.iter(|| black_box(cache.get(&black_box(500)))));
    group.bench_function("lru_set_evict", |b| {
        let mut next = MEDIUM_BATCH;
        b.iter(|| {
            cache.set(next, next);
            next += 1;
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_select, bench_primitives);
criterion_main!(benches);
