//! Benchmarks for FSST training, compression, and decompression.
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use fsst_codec::{build, Compressor, Decompressor};

fn corpus() -> Vec<String> {
    (0..4_096)
        .map(|i| {
            format!(
                "GET /api/v1/users/{}/orders?page={}&limit=50 HTTP/1.1 status=200 bytes={}",
                i % 512,
                i % 32,
                1024 + i,
            )
        })
        .collect()
}

fn bench_fsst(c: &mut Criterion) {
    let lines = corpus();
    let total_bytes: usize = lines.iter().map(|line| line.len()).sum();

    let mut group = c.benchmark_group("fsst");
    group.throughput(Throughput::Bytes(total_bytes as u64));

    group.bench_function("train", |b| {
        b.iter(|| black_box(build(black_box(&lines))));
    });

    let dict = build(&lines);
    let compressor = Compressor::new(&dict).unwrap();
    let decompressor = Decompressor::new(&dict).unwrap();

    group.bench_function("compress", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(compressor.compress(black_box(line.as_bytes())));
            }
        });
    });

    let compressed: Vec<Vec<u8>> = lines
        .iter()
        .map(|line| compressor.compress(line.as_bytes()))
        .collect();
    group.bench_function("decompress", |b| {
        b.iter(|| {
            for record in &compressed {
                black_box(decompressor.decompress(black_box(record)).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(compress_bench, bench_fsst);
criterion_main!(compress_bench);
