//! Benchmarks for ensemble frame decoding
//!
//! Measures:
//! - Whole-frame decode of a four-beam ensemble at typical and deep profiles
//! - Single-dataset decode for the largest fixed layouts
//!
//! Platform: Cross-platform (synthetic frames, CI-safe)

use adcp_waves::ensemble::{BottomTrack, Dataset, Ensemble};
use adcp_waves::test_utils::{four_beam_frame, sample_bottom_track, vertical_frame};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for bins in [30usize, 200] {
        let bytes = four_beam_frame(1, bins).encode().expect("synthetic frame encodes");
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("four_beam", bins), &bytes, |b, bytes| {
            b.iter(|| Ensemble::decode(black_box(bytes)).expect("decodes"));
        });
    }

    let vertical = vertical_frame(2, 30).encode().expect("synthetic frame encodes");
    group.throughput(Throughput::Bytes(vertical.len() as u64));
    group.bench_function("vertical", |b| {
        b.iter(|| Ensemble::decode(black_box(&vertical)).expect("decodes"));
    });

    group.finish();
}

fn bench_bottom_track(c: &mut Criterion) {
    let bytes = sample_bottom_track(4).encode().expect("bottom track encodes");
    c.bench_function("bottom_track_decode", |b| {
        b.iter(|| BottomTrack::decode(black_box(&bytes)).expect("decodes"));
    });
}

criterion_group!(benches, bench_frame_decode, bench_bottom_track);
criterion_main!(benches);
