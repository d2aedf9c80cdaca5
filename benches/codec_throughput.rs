//! Wire codec throughput benchmark.
//!
//! Measures signing, encoding and verified decoding of stream messages of
//! varying size using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mcore_kernel::ipc::codec::{decode, encode, Signer};
use mcore_kernel::ipc::Message;
use mcore_kernel::types::SessionId;
use serde_json::json;

const KEY: &str = "5ca1ab1e-0000-4000-8000-000000000000";
const TEXT_SIZES: &[usize] = &[0, 64, 1024, 4096, 65536];

fn stream_message(size: usize) -> Message {
    Message::new(
        "stream",
        &SessionId::new(),
        json!({ "name": "stdout", "text": "x".repeat(size) }),
    )
}

fn bench_encode(c: &mut Criterion) {
    let signer = Signer::new(KEY);

    let mut group = c.benchmark_group("encode");
    for &size in TEXT_SIZES {
        let message = stream_message(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &message, |b, m| {
            b.iter(|| encode(black_box(m), &signer).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let signer = Signer::new(KEY);

    let mut group = c.benchmark_group("decode");
    for &size in TEXT_SIZES {
        // Pre-build the wire frames
        let frames = encode(&stream_message(size), &signer).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &frames, |b, f| {
            b.iter(|| decode(black_box(f.clone()), &signer).unwrap());
        });
    }
    group.finish();
}

fn bench_unsigned_round_trip(c: &mut Criterion) {
    let signer = Signer::new("");
    let message = stream_message(1024);

    c.bench_function("unsigned_round_trip_1kb", |b| {
        b.iter(|| {
            let frames = encode(black_box(&message), &signer).unwrap();
            decode(frames, &signer).unwrap()
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_unsigned_round_trip);
criterion_main!(benches);
