use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use endcrypt::cipher::{decrypt, encrypt, schedule_rounds, ChaoticSequence, KeyScheduler};
use endcrypt::engine::{encode_png, test_pattern, EngineConfig};
use endcrypt::metrics::MetricsCalculator;
use endcrypt::{CipherEngine, EncryptionLevel};
use std::hint::black_box;

fn bench_cipher(c: &mut Criterion) {
    let scheduler = KeyScheduler::default();
    let grid = test_pattern().expect("test pattern");
    let mut group = c.benchmark_group("cipher");

    for level in EncryptionLevel::ALL {
        let state = scheduler.derive("benchmark-key", level).expect("derive");
        let keys = schedule_rounds(&state, grid.pixel_count(), grid.channels()).expect("schedule");
        let encrypted = encrypt(grid.clone(), &keys, None).expect("encrypt");

        group.bench_with_input(BenchmarkId::new("schedule", level), &state, |b, state| {
            b.iter(|| schedule_rounds(black_box(state), grid.pixel_count(), grid.channels()))
        });
        group.bench_with_input(BenchmarkId::new("encrypt", level), &keys, |b, keys| {
            b.iter(|| encrypt(black_box(grid.clone()), keys, None))
        });
        group.bench_with_input(BenchmarkId::new("decrypt", level), &keys, |b, keys| {
            b.iter(|| decrypt(black_box(encrypted.clone()), keys, None))
        });
    }
    group.finish();
}

fn bench_sequence(c: &mut Criterion) {
    let state = KeyScheduler::default()
        .derive("benchmark-key", EncryptionLevel::Low)
        .expect("derive");
    c.bench_function("sequence 1M", |b| {
        b.iter(|| ChaoticSequence::generate(&state, 1 << 20).fold(0u64, |acc, v| acc ^ v))
    });
}

fn bench_metrics(c: &mut Criterion) {
    let grid = test_pattern().expect("test pattern");
    let state = KeyScheduler::default()
        .derive("benchmark-key", EncryptionLevel::Medium)
        .expect("derive");
    let keys = schedule_rounds(&state, grid.pixel_count(), grid.channels()).expect("schedule");
    let encrypted = encrypt(grid.clone(), &keys, None).expect("encrypt");

    c.bench_function("metrics compute", |b| {
        b.iter(|| MetricsCalculator::compute(black_box(&grid), &encrypted, &grid))
    });
}

fn bench_process(c: &mut Criterion) {
    let png = encode_png(&test_pattern().expect("test pattern"), false).expect("encode");
    let mut group = c.benchmark_group("process");
    group.sample_size(20);

    for optimize in [false, true] {
        let engine = CipherEngine::new(EngineConfig::default().with_png_optimization(optimize))
            .expect("engine");
        group.bench_function(BenchmarkId::new("medium", optimize), |b| {
            b.iter(|| engine.respond(black_box(&png), "medium", "benchmark-key"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cipher, bench_sequence, bench_metrics, bench_process);
criterion_main!(benches);
