use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use tokensim::cluster::{Kmeans, VectorSpace};
use tokensim::graph::{ElementId, InMemoryGraph};
use tokensim::{AnalysisConfig, ContentAnalysis};

const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
];

fn synthetic_texts(rng: &mut StdRng, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            (0..4)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_pairwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairwise");

    let mut rng = StdRng::seed_from_u64(42);
    let texts = synthetic_texts(&mut rng, 500);
    let graph = InMemoryGraph::with_vertex_text(
        "Label",
        texts.iter().enumerate().map(|(i, t)| (i as ElementId, t.as_str())),
    );

    group.bench_function("trigrams_n500_chunk100", |b| {
        b.iter(|| {
            let config = AnalysisConfig::new("Label").with_threshold(0.6).with_limits(4, 100);
            let mut run = ContentAnalysis::new(config).unwrap();
            run.pairwise_similarities(black_box(&graph)).unwrap();
        })
    });

    group.finish();
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans");

    let mut rng = StdRng::seed_from_u64(42);
    let n = 1000;
    let tokens = 64;
    let k = 10;

    let space = VectorSpace::from_vectors((0..n).map(|e| {
        let cells = (0..8)
            .map(|_| (rng.random_range(0..tokens), rng.random::<f32>() + 0.1))
            .collect();
        (e as ElementId, cells)
    }));

    group.bench_function("fit_n1000_t64_k10", |b| {
        b.iter(|| {
            let model = Kmeans::new(k).with_max_iter(10).with_seed(42);
            model.fit(black_box(&space)).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_pairwise, bench_kmeans);
criterion_main!(benches);
