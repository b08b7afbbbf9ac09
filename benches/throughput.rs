//! Throughput Benchmark for EmberKV
//!
//! Measures the store, the RESP codec and the full write path through the
//! append-only log.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use emberkv::commands::CommandHandler;
use emberkv::persistence::AppendOnlyLog;
use emberkv::protocol::{RespParser, RespValue};
use emberkv::storage::Store;
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(format!("key:{}", i), "small_value");
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = "x".repeat(1024);
        b.iter(|| {
            store.set(format!("key:{}", i), value.clone());
            i += 1;
        });
    });

    group.bench_function("hset", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.hset(
                format!("hash:{}", i % 100),
                format!("field:{}", i),
                "value",
            );
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    for i in 0..100_000 {
        store.set(format!("key:{}", i), format!("value:{}", i));
    }
    for i in 0..100 {
        store.hset("user", format!("field:{}", i), "v");
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)));
            i += 1;
        });
    });

    group.bench_function("hgetall_100", |b| {
        b.iter(|| black_box(store.hgetall("user")));
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = Arc::new(Store::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            store.set(key.clone(), "value");
                            store.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

/// Benchmark RESP encoding and decoding
fn bench_codec(c: &mut Criterion) {
    let request = RespValue::command(&["HSET", "user:1000", "name", "Ariz"]);
    let encoded = request.serialize();
    let mut parser = RespParser::new();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(encoded.len() as u64));

    group.bench_function("serialize_request", |b| {
        b.iter(|| black_box(request.serialize()));
    });

    group.bench_function("parse_request", |b| {
        b.iter(|| black_box(parser.parse(&encoded).unwrap()));
    });

    let large = RespValue::bulk_string(Bytes::from(vec![b'x'; 64 * 1024]));
    let large_encoded = large.serialize();
    group.bench_function("parse_64k_bulk", |b| {
        b.iter(|| black_box(parser.parse(&large_encoded).unwrap()));
    });

    group.finish();
}

/// Benchmark SET through the dispatcher with the append-only log enabled
fn bench_logged_write(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let handler = rt.block_on(async {
        let aof = AppendOnlyLog::open(dir.path().join("bench.aof"), Duration::from_secs(1))
            .await
            .unwrap();
        CommandHandler::with_aof(Arc::new(Store::new()), Arc::new(aof))
    });

    let mut group = c.benchmark_group("logged_write");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 1000);
            let request = RespValue::command(&["SET", key.as_str(), "value"]);
            black_box(rt.block_on(handler.execute(request)));
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_concurrent,
    bench_codec,
    bench_logged_write,
);

criterion_main!(benches);
