//! Performance benchmarks for the call protocol hot paths
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use call_gateway::core::protocol::{
    AudioChunk, ClientMessage, chunk_frames, concat_chunks, decode_samples, encode_samples,
};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

/// Benchmark decoding inbound binary frames
fn bench_frame_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoding");
    group.measurement_time(Duration::from_secs(5));

    // 20ms, 100ms and 1s of 24kHz audio
    for samples in [480usize, 2_400, 24_000] {
        let frame = encode_samples(&vec![0.1f32; samples]);
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("decode", samples), &frame, |b, frame| {
            b.iter(|| decode_samples(black_box(frame)));
        });
    }

    group.finish();
}

/// Benchmark classifying text frames
fn bench_text_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_classification");

    for text in ["EOS", "INT", "hello there"] {
        group.bench_with_input(BenchmarkId::new("from_text", text), &text, |b, text| {
            b.iter(|| ClientMessage::from_text(black_box(text)));
        });
    }

    group.finish();
}

/// Benchmark assembling an utterance from irregular chunks
fn bench_utterance_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("utterance_assembly");
    group.measurement_time(Duration::from_secs(5));

    // ~10s of speech in 20ms-ish chunks of varying size
    let chunks: Vec<AudioChunk> = (0..500)
        .map(|i| AudioChunk(vec![0.2f32; 400 + (i % 7) * 20]))
        .collect();
    let total: usize = chunks.iter().map(AudioChunk::len).sum();

    group.throughput(Throughput::Elements(total as u64));
    group.bench_function("concat_500_chunks", |b| {
        b.iter(|| concat_chunks(black_box(&chunks)));
    });

    group.finish();
}

/// Benchmark splitting synthesized speech into outbound frames
fn bench_outbound_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("outbound_chunking");
    group.measurement_time(Duration::from_secs(5));

    for seconds in [1usize, 5, 30] {
        let samples = vec![0.3f32; seconds * 24_000];
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("chunk_frames", format!("{seconds}s")),
            &samples,
            |b, samples| {
                b.iter(|| chunk_frames(black_box(samples)).count());
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_decoding,
    bench_text_classification,
    bench_utterance_assembly,
    bench_outbound_chunking,
);

criterion_main!(benches);
