//! Benchmark suite for minibatch assembly.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - Alignment engine throughput per mode
//! - Full batcher pass (extraction + alignment) over in-memory sequences
//! - Standardizer overhead on assembled batches

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use sequence_batcher::{
    align_batch, AlignmentMode, BatchPreProcessor, BatcherConfig, ExampleArrays,
    FeatureStandardizer, MiniBatchIterator, SequenceBatcher, VecSequenceSource,
};

const FEATURE_WIDTH: usize = 16;
const NUM_CLASSES: usize = 3;

/// Lengths cycle through 50..150 so every batch needs padding.
fn sequence_length(i: usize) -> usize {
    50 + (i * 37) % 100
}

fn create_examples(n: usize, many_to_one: bool) -> Vec<ExampleArrays> {
    (0..n)
        .map(|i| {
            let len = sequence_length(i);
            let label_len = if many_to_one { 1 } else { len };
            ExampleArrays::new(
                Array2::from_shape_fn((len, FEATURE_WIDTH), |(t, f)| (t * f) as f64 * 0.01),
                Array2::from_shape_fn((label_len, NUM_CLASSES), |(t, c)| {
                    if (t + i) % NUM_CLASSES == c {
                        1.0
                    } else {
                        0.0
                    }
                }),
            )
        })
        .collect()
}

/// Single-source data: label column 0, then `FEATURE_WIDTH` feature columns.
fn create_source(n: usize) -> VecSequenceSource {
    VecSequenceSource::from_rows(
        (0..n)
            .map(|i| {
                (0..sequence_length(i))
                    .map(|t| {
                        let mut row = vec![((t + i) % NUM_CLASSES) as f64];
                        row.extend((0..FEATURE_WIDTH).map(|f| (t * f) as f64 * 0.01));
                        row
                    })
                    .collect()
            })
            .collect(),
    )
}

fn bench_align_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_batch");

    for batch_size in [16usize, 64] {
        let padded = create_examples(batch_size, true);
        group.throughput(Throughput::Elements(batch_size as u64));

        for mode in [AlignmentMode::AlignStart, AlignmentMode::AlignEnd] {
            group.bench_with_input(
                BenchmarkId::new(mode.as_str(), batch_size),
                &padded,
                |b, examples| b.iter(|| align_batch(black_box(mode), black_box(examples))),
            );
        }

        let equal: Vec<_> = (0..batch_size)
            .map(|_| {
                ExampleArrays::new(
                    Array2::ones((100, FEATURE_WIDTH)),
                    Array2::ones((100, NUM_CLASSES)),
                )
            })
            .collect();
        group.bench_with_input(
            BenchmarkId::new(AlignmentMode::EqualLength.as_str(), batch_size),
            &equal,
            |b, examples| b.iter(|| align_batch(AlignmentMode::EqualLength, black_box(examples))),
        );
    }

    group.finish();
}

fn bench_batcher_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("batcher_pass");
    let n = 256;
    group.throughput(Throughput::Elements(n as u64));

    let config = BatcherConfig::classification(NUM_CLASSES)
        .with_label_index(0)
        .with_mini_batch_size(32)
        .with_alignment(AlignmentMode::AlignStart);
    let mut batcher = SequenceBatcher::single(create_source(n), config).expect("valid config");

    group.bench_function("single_source_align_start", |b| {
        b.iter(|| {
            batcher.reset();
            let mut total = 0;
            while batcher.has_next() {
                total += batcher.next_batch().expect("batch").num_examples();
            }
            black_box(total)
        })
    });

    group.finish();
}

fn bench_standardizer(c: &mut Criterion) {
    let examples = create_examples(64, false);
    let batch = align_batch(AlignmentMode::AlignStart, &examples).expect("batch");

    let mut standardizer = FeatureStandardizer::standard(FEATURE_WIDTH);
    standardizer.fit_batch(&batch);

    c.bench_function("standardizer_64x16", |b| {
        b.iter(|| {
            let mut copy = batch.clone();
            standardizer.pre_process(black_box(&mut copy));
            copy
        })
    });
}

criterion_group!(
    benches,
    bench_align_modes,
    bench_batcher_pass,
    bench_standardizer
);
criterion_main!(benches);
