use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use wakeline::pipeline::activation::{ActivationConfig, next_activation};
use wakeline::{CollectorSink, MockEngine, Pipeline, PipelineSettings};

/// Ten seconds of 16 kHz audio.
fn audio() -> Vec<i16> {
    (0..160_000).map(|i| ((i % 400) as i16 - 200) * 40).collect()
}

fn settings(detectors: usize) -> PipelineSettings {
    PipelineSettings::default().with_wake_words((0..detectors).map(|i| format!("wake_{}", i)))
}

/// Full pipeline: start, feed in 80 ms chunks, drain.
fn bench_pipeline(c: &mut Criterion) {
    let audio = audio();
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(audio.len() as u64));
    group.sample_size(20);

    for detectors in [1usize, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("detectors", detectors),
            &detectors,
            |b, &detectors| {
                b.iter(|| {
                    let engine = MockEngine::new().with_mel_frames(32);
                    let handle = Pipeline::new(settings(detectors), Arc::new(engine))
                        .with_sink(Box::new(CollectorSink::new()))
                        .start()
                        .unwrap_or_else(|e| panic!("pipeline start failed: {}", e));
                    for chunk in audio.chunks(1280) {
                        handle.ingest_pcm(black_box(chunk));
                    }
                    handle
                        .shutdown()
                        .unwrap_or_else(|e| panic!("pipeline shutdown failed: {}", e))
                });
            },
        );
    }

    group.finish();
}

/// The activation automaton on its own.
fn bench_activation(c: &mut Criterion) {
    let config = ActivationConfig::default();
    let scores: Vec<f32> = (0..10_000).map(|i| ((i % 37) as f32) / 36.0).collect();

    c.bench_function("activation/10k", |b| {
        b.iter(|| {
            let mut counter = 0;
            let mut triggers = 0u32;
            for &p in &scores {
                let (next, triggered) = next_activation(counter, black_box(p), &config);
                counter = next;
                triggers += triggered as u32;
            }
            triggers
        });
    });
}

criterion_group!(benches, bench_pipeline, bench_activation);
criterion_main!(benches);
