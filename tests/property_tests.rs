use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tokensim::cluster::{Kmeans, MergeClustering, VectorSpace};
use tokensim::graph::{ElementId, ElementType, InMemoryGraph};
use tokensim::config::ElementScope;
use tokensim::{AnalysisConfig, ContentAnalysis, ElementSimilarity, SimilarityMethod};

fn graph(texts: &[String]) -> InMemoryGraph {
    let mut graph = InMemoryGraph::with_vertex_text(
        "Label",
        texts.iter().enumerate().map(|(i, t)| (i as ElementId, t.as_str())),
    );
    graph.add_attribute(ElementType::Vertex, "Label");
    graph
}

fn pairs(texts: &[String], threshold: f32, method: SimilarityMethod, chunk: usize) -> Vec<ElementSimilarity> {
    let config = AnalysisConfig::new("Label")
        .with_threshold(threshold)
        .with_similarity(method)
        .with_limits(3, chunk);
    ContentAnalysis::new(config).unwrap().pairwise_similarities(&graph(texts)).unwrap()
}

fn method() -> impl Strategy<Value = SimilarityMethod> {
    prop_oneof![
        Just(SimilarityMethod::BinaryTaxicab),
        Just(SimilarityMethod::IntegerTaxicab),
        Just(SimilarityMethod::BinaryEuclidean),
        Just(SimilarityMethod::IntegerEuclidean),
    ]
}

fn texts() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c ]{0,10}", 0..14)
}

/// Reference components by repeated relabelling.
fn components(pairs: &[(ElementId, ElementId)]) -> Vec<BTreeSet<ElementId>> {
    let mut label: HashMap<ElementId, ElementId> = HashMap::new();
    for &(a, b) in pairs {
        label.entry(a).or_insert(a);
        label.entry(b).or_insert(b);
    }
    loop {
        let mut changed = false;
        for &(a, b) in pairs {
            let low = label[&a].min(label[&b]);
            for e in [a, b] {
                if label[&e] != low {
                    label.insert(e, low);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    let mut groups: HashMap<ElementId, BTreeSet<ElementId>> = HashMap::new();
    for (e, l) in label {
        groups.entry(l).or_default().insert(e);
    }
    let mut out: Vec<_> = groups.into_values().collect();
    out.sort();
    out
}

proptest! {
    #[test]
    fn prop_pairs_are_canonical_and_sorted(texts in texts(), method in method(), threshold in 0.0f32..1.0) {
        let found = pairs(&texts, threshold, method, 4);
        for p in &found {
            prop_assert!(p.low() < p.high());
            prop_assert!(p.score() >= threshold);
        }
        for w in found.windows(2) {
            prop_assert!((w[0].low(), w[0].high()) < (w[1].low(), w[1].high()));
        }
    }

    #[test]
    fn prop_raising_threshold_only_removes_pairs(texts in texts(), method in method(), a in 0.0f32..1.0, b in 0.0f32..1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let loose: BTreeSet<_> = pairs(&texts, low, method, 4).iter().map(|p| (p.low(), p.high())).collect();
        let strict: BTreeSet<_> = pairs(&texts, high, method, 4).iter().map(|p| (p.low(), p.high())).collect();
        prop_assert!(strict.is_subset(&loose));
    }

    #[test]
    fn prop_chunking_does_not_change_results(texts in texts(), method in method(), chunk in 1usize..6) {
        let reference = pairs(&texts, 0.2, method, 1000);
        let chunked = pairs(&texts, 0.2, method, chunk);
        prop_assert_eq!(reference.len(), chunked.len());
        for (r, c) in reference.iter().zip(&chunked) {
            prop_assert_eq!((r.low(), r.high()), (c.low(), c.high()));
            prop_assert!((r.score() - c.score()).abs() < 1e-5);
        }
    }

    #[test]
    fn prop_selection_restricts_full_run(
        texts in texts(),
        method in method(),
        chunk in 1usize..6,
        selected in prop::collection::vec(any::<bool>(), 14),
    ) {
        let mut graph = graph(&texts);
        let interest: BTreeSet<ElementId> = (0..texts.len() as ElementId)
            .filter(|&e| selected[e as usize])
            .collect();
        for &e in &interest {
            graph.select(ElementType::Vertex, e);
        }
        let config = AnalysisConfig::new("Label")
            .with_threshold(0.0)
            .with_similarity(method)
            .with_limits(3, chunk)
            .with_element_scope(ElementScope::SelectedOnly);
        let restricted = ContentAnalysis::new(config).unwrap().pairwise_similarities(&graph).unwrap();

        let expected: Vec<ElementSimilarity> = pairs(&texts, 0.0, method, 1000)
            .into_iter()
            .filter(|p| interest.contains(&p.low()) || interest.contains(&p.high()))
            .collect();
        prop_assert_eq!(restricted.len(), expected.len());
        for (r, e) in restricted.iter().zip(&expected) {
            prop_assert_eq!((r.low(), r.high()), (e.low(), e.high()));
            prop_assert!((r.score() - e.score()).abs() < 1e-5);
        }
    }

    #[test]
    fn prop_sparse_ids_match_dense_ids(texts in texts(), method in method(), chunk in 1usize..6, stride in 1u32..50_000) {
        let mut spread = InMemoryGraph::with_vertex_text(
            "Label",
            texts.iter().enumerate().map(|(i, t)| (i as ElementId * stride, t.as_str())),
        );
        spread.add_attribute(ElementType::Vertex, "Label");
        let config = AnalysisConfig::new("Label")
            .with_threshold(0.0)
            .with_similarity(method)
            .with_limits(3, chunk);
        let found = ContentAnalysis::new(config).unwrap().pairwise_similarities(&spread).unwrap();
        let dense = pairs(&texts, 0.0, method, chunk);
        prop_assert_eq!(found.len(), dense.len());
        for (f, d) in found.iter().zip(&dense) {
            prop_assert_eq!((f.low(), f.high()), (d.low() * stride, d.high() * stride));
            prop_assert!((f.score() - d.score()).abs() < 1e-5);
        }
    }

    #[test]
    fn prop_merge_is_transitive_closure(edges in prop::collection::vec((0u32..20, 0u32..20), 0..30)) {
        let pairs: Vec<ElementSimilarity> = edges
            .iter()
            .filter_map(|&(a, b)| ElementSimilarity::new(a, b, 1.0))
            .collect();
        let raw: Vec<_> = pairs.iter().map(|p| (p.low(), p.high())).collect();

        let mut merged: Vec<BTreeSet<ElementId>> = MergeClustering::from_pairs(&pairs)
            .clusters()
            .into_values()
            .map(|members| members.into_iter().collect())
            .collect();
        merged.sort();
        prop_assert_eq!(merged, components(&raw));
    }

    #[test]
    fn prop_kmeans_errors_never_rise(
        vectors in prop::collection::vec(prop::collection::vec((0i64..8, 0.5f32..3.0), 1..5), 1..16),
        k in 1usize..5,
        seed in any::<u64>(),
    ) {
        let space = VectorSpace::from_vectors(
            vectors.into_iter().enumerate().map(|(e, cells)| (e as ElementId, cells)),
        );
        let fit = Kmeans::new(k).with_seed(seed).fit(&space).unwrap();
        prop_assert_eq!(fit.assignment.len(), space.len());
        prop_assert!(fit.assignment.num_clusters() <= k);
        prop_assert!(fit.errors.windows(2).all(|w| w[1] <= w[0]));
    }
}
