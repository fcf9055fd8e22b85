//! Store fast-path benchmarks for mmforge
//!
//! Measures the layout engine, the schema digest, and the mapped
//! fast paths: append, field read/write, and a full seqlock write pair.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

use mmforge::{compute_layout, schema_hash, FieldDef, FieldKind, Store, StoreOptions};

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    let fields: Vec<FieldDef> = (0..16)
        .map(|i| {
            if i % 4 == 3 {
                FieldDef::new(format!("field_{i}"), FieldKind::String).with_max_size(64)
            } else {
                FieldDef::new(format!("field_{i}"), FieldKind::Uint64)
            }
        })
        .collect();

    group.bench_function("compute_16_fields", |b| {
        b.iter(|| compute_layout(black_box(&fields)).unwrap());
    });

    let layout = compute_layout(&fields).unwrap();
    let descriptors = layout.descriptors();
    group.bench_function("schema_hash_16_fields", |b| {
        b.iter(|| schema_hash(black_box(&descriptors)));
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    let layout = compute_layout(&[
        FieldDef::new("id", FieldKind::Uint64),
        FieldDef::new("value", FieldKind::Float64),
        FieldDef::new("name", FieldKind::String).with_max_size(32),
    ])
    .unwrap();
    let name = layout.field("name").unwrap().clone();

    let dir = tempdir().unwrap();
    // The append benchmark can claim tens of millions of slots; reserve
    // enough address space that growth never hits the ceiling.
    let store = Store::create(
        dir.path().join("bench.mmfg"),
        &layout,
        1,
        &StoreOptions::new().reserve_va(1 << 34),
    )
    .unwrap();
    let idx = store.append().unwrap();
    store.write_u64(idx, 8, 42).unwrap();
    store
        .write_string(idx, name.offset, name.size, 32, "benchmark")
        .unwrap();

    group.bench_function("append", |b| {
        b.iter(|| store.append().unwrap());
    });

    group.bench_function("read_u64", |b| {
        b.iter(|| store.read_u64(black_box(idx), black_box(8)).unwrap());
    });

    group.bench_function("write_u64", |b| {
        b.iter(|| store.write_u64(black_box(idx), 8, black_box(7)).unwrap());
    });

    group.bench_function("read_string", |b| {
        b.iter(|| {
            store
                .read_string(black_box(idx), name.offset, name.size, 32)
                .unwrap()
        });
    });

    group.bench_function("seqlock_write_pair", |b| {
        b.iter(|| {
            store.begin_write(idx).unwrap();
            store.write_u64(idx, 8, black_box(9)).unwrap();
            store.write_f64(idx, 16, black_box(1.5)).unwrap();
            store.end_write(idx).unwrap();
        });
    });

    group.bench_function("seqlock_validated_read", |b| {
        b.iter(|| loop {
            let seq = store.read_begin(idx).unwrap();
            if seq & 1 == 1 {
                continue;
            }
            let id = store.read_u64(idx, 8).unwrap();
            if store.read_valid(idx, seq).unwrap() {
                break black_box(id);
            }
        });
    });

    group.finish();
    store.close().unwrap();
}

criterion_group!(benches, bench_layout, bench_store);
criterion_main!(benches);
