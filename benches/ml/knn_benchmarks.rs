use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use knn::k_nearest::{
    Backend, Dataset, Example, KNNConfig, KNNModel, KNNTrainer, NeighbourSearch, TrainingCounter,
    VotingCombiner,
};
use knn::Distance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const NUM_FEATURES: usize = 200;
const NNZ: usize = 20;

fn random_example(rng: &mut StdRng, label: u32) -> Example<u32> {
    let features: Vec<(String, f64)> = (0..NNZ)
        .map(|_| {
            let id = rng.gen_range(0..NUM_FEATURES);
            (format!("f{:03}", id), rng.gen_range(-1.0..1.0))
        })
        .collect();
    Example::new(features, label)
}

fn build_dataset(size: usize, seed: u64) -> Dataset<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let examples = (0..size)
        .map(|_| {
            let label = rng.gen_range(0..10);
            random_example(&mut rng, label)
        })
        .collect();
    Dataset::new("bench", examples).unwrap()
}

fn train(dataset: &Dataset<u32>, backend: Backend, threads: usize) -> KNNModel<u32> {
    let config = KNNConfig::new(10, Distance::L2, VotingCombiner)
        .with_backend(backend)
        .with_num_threads(threads);
    KNNTrainer::new(config)
        .unwrap()
        .train_default(dataset, HashMap::new(), &mut TrainingCounter::new())
        .unwrap()
}

fn bench_single_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbour_search");

    for size in [1_000, 10_000] {
        let dataset = build_dataset(size, 1);
        let model = train(&dataset, Backend::ThreadPool, 1);
        let mut rng = StdRng::seed_from_u64(2);
        let (query, _) = model
            .feature_map()
            .vectorize(&random_example(&mut rng, 0).features)
            .unwrap();

        for distance in [Distance::L1, Distance::L2, Distance::Cosine] {
            let search = NeighbourSearch::new(10, distance);
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(
                BenchmarkId::new(distance.to_string(), size),
                &size,
                |b, _| b.iter(|| black_box(search.search(model.store(), black_box(&query)))),
            );
        }
    }

    group.finish();
}

fn bench_batch_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_inference");
    group.sample_size(10);

    let dataset = build_dataset(5_000, 3);
    let mut rng = StdRng::seed_from_u64(4);
    let queries: Vec<Example<u32>> = (0..500).map(|_| random_example(&mut rng, 0)).collect();

    for backend in [Backend::ThreadPool, Backend::Stream] {
        for threads in [1, 4] {
            let model = train(&dataset, backend, threads);
            group.throughput(Throughput::Elements(queries.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(backend.to_string(), threads),
                &threads,
                |b, _| b.iter(|| black_box(model.predict_batch(black_box(&queries)))),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_single_query, bench_batch_backends);
criterion_main!(benches);
