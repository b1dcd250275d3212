use tokensim::config::{ElementScope, FollowUpChoice, PhraseConfig, TokenizingMethod};
use tokensim::followup::{NO_CLUSTER, SIMILARITY_SUBTYPE};
use tokensim::graph::{ElementType, InMemoryGraph};
use tokensim::handler::hash_token;
use tokensim::matrix::Index;
use tokensim::{
    AnalysisConfig, AnalysisResult, ContentAnalysis, Error, FollowUpOutcome, RunState, SimilarityMethod,
};

fn desserts() -> InMemoryGraph {
    InMemoryGraph::with_vertex_text("Label", [(1, "apple pie"), (2, "apple tart"), (3, "banana split")])
}

fn five_grams() -> AnalysisConfig {
    AnalysisConfig::new("Label")
        .with_tokenizing(TokenizingMethod::NGrams, 5)
        .with_threshold(0.0)
        .with_similarity(SimilarityMethod::BinaryTaxicab)
}

#[test]
fn shared_five_grams_pair_apple_desserts() {
    let mut run = ContentAnalysis::new(five_grams()).unwrap();
    let pairs = run.pairwise_similarities(&desserts()).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].low(), pairs[0].high()), (1, 2));
    // "apple" and "pple "
    assert_eq!(pairs[0].score(), 2.0);
    assert_eq!(run.state(), RunState::Converged);
}

#[test]
fn similar_pairs_become_edges() {
    let mut graph = desserts();
    let mut run = ContentAnalysis::new(five_grams().with_follow_up(FollowUpChoice::AddTransactions)).unwrap();
    let pairs = run.pairwise_similarities(&graph).unwrap();
    let outcome = run.follow_up(&mut graph, &AnalysisResult::Pairs(pairs)).unwrap();
    assert_eq!(outcome, FollowUpOutcome::Completed { applied: 1 });
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edges()[0].subtype, SIMILARITY_SUBTYPE);
}

#[test]
fn similar_pairs_become_selections() {
    let mut graph = desserts();
    let mut run = ContentAnalysis::new(five_grams().with_follow_up(FollowUpChoice::MakeSelections)).unwrap();
    let pairs = run.pairwise_similarities(&graph).unwrap();
    run.follow_up(&mut graph, &AnalysisResult::Pairs(pairs)).unwrap();
    assert_eq!(graph.named_selections().len(), 1);
    assert_eq!(graph.named_selections()[0].1, vec![1, 2]);
}

#[test]
fn empty_graph_produces_nothing_and_touches_nothing() {
    let mut graph = InMemoryGraph::new();
    graph.add_attribute(ElementType::Vertex, "Label");

    let mut run = ContentAnalysis::new(five_grams()).unwrap();
    let pairs = run.pairwise_similarities(&graph).unwrap();
    assert!(pairs.is_empty());
    let outcome = run.follow_up(&mut graph, &AnalysisResult::Pairs(pairs)).unwrap();
    assert_eq!(outcome, FollowUpOutcome::Skipped);

    let mut run = ContentAnalysis::new(AnalysisConfig::new("Label").with_number_of_means(3)).unwrap();
    let fit = run.cluster_documents(&graph).unwrap();
    assert!(fit.assignment.is_empty());
    assert_eq!(run.follow_up(&mut graph, &fit.into()).unwrap(), FollowUpOutcome::Skipped);
    assert_eq!(graph.mutation_count(), 0);
}

#[test]
fn non_positive_cluster_counts_are_rejected() {
    for k in [0, 1, -3] {
        let mut run = ContentAnalysis::new(AnalysisConfig::new("Label").with_number_of_means(k)).unwrap();
        match run.cluster_documents(&desserts()) {
            Err(Error::InvalidClusterCount { requested, .. }) => assert_eq!(requested, k),
            other => panic!("expected InvalidClusterCount for k={k}, got {other:?}"),
        }
        assert_eq!(run.state(), RunState::Idle);
    }
}

#[test]
fn kmeans_writes_every_element_a_cluster() {
    let mut graph = InMemoryGraph::with_vertex_text(
        "Label",
        [
            (10, "red green blue"),
            (11, "red green blue"),
            (12, "north south east"),
            (13, "north south east"),
        ],
    );
    let config = AnalysisConfig::new("Label")
        .with_tokenizing(TokenizingMethod::NWords, 1)
        .with_threshold(1.0)
        .with_number_of_means(2)
        .with_seed(17);
    let mut run = ContentAnalysis::new(config).unwrap();
    let fit = run.cluster_documents(&graph).unwrap();
    run.follow_up(&mut graph, &fit.into()).unwrap();

    let clusters = graph.clusters(ElementType::Vertex).unwrap();
    assert_eq!(clusters.len(), 4);
    assert!(clusters.values().all(|c| c != NO_CLUSTER));
    assert_eq!(clusters[&10], clusters[&11]);
    assert_eq!(clusters[&12], clusters[&13]);
    assert_ne!(clusters[&10], clusters[&12]);
}

#[test]
fn far_apart_ids_are_compared_in_one_pass() {
    let graph = InMemoryGraph::with_vertex_text("Label", [(0, "apple pie"), (4_000_000, "apple tart")]);
    let mut run = ContentAnalysis::new(five_grams().with_limits(4, 100)).unwrap();
    let pairs = run.pairwise_similarities(&graph).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].low(), pairs[0].high()), (0, 4_000_000));
}

#[test]
fn phrases_are_counted_within_sentences() {
    let graph = InMemoryGraph::with_vertex_text(
        "Body",
        [
            (0, "Shipment of red apples arrived. Green bananas next!"),
            (1, "The red apples were late"),
            (2, "red, ripe apples"),
        ],
    );
    let phrases = PhraseConfig::default().with_length(2, 3);
    let config = AnalysisConfig::new("Body").with_phrases(phrases).with_limits(2, 1);
    let mut run = ContentAnalysis::new(config).unwrap();
    let handler = run.phrase_analysis(&graph).unwrap();
    assert_eq!(run.state(), RunState::Converged);

    let count = |token: &str| handler.matrix().column_size(Index::from(hash_token(token)));
    let red_apples = hash_token("red apples");
    assert!(handler.is_phrase(red_apples));
    assert_eq!(count("red apples"), 3);
    assert_eq!(handler.constituents(red_apples).len(), 2);
    assert_eq!(count("green bananas"), 1);
    assert_eq!(count("apples green"), 0);
    assert_eq!(count("apples"), 3);
    assert!(!handler.is_phrase(hash_token("apples")));
    assert_eq!(count("the"), 0);
}

#[test]
fn transactions_are_compared_like_vertices() {
    let mut graph = InMemoryGraph::new();
    for (id, text) in [(0, "wire transfer"), (1, "wire transfers"), (2, "cash deposit")] {
        graph.add_element(ElementType::Transaction, id);
        graph.set_string(ElementType::Transaction, "Note", id, text);
    }
    let config = AnalysisConfig::new("Note")
        .with_element_type(ElementType::Transaction)
        .with_threshold(0.8);
    let pairs = ContentAnalysis::new(config).unwrap().pairwise_similarities(&graph).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].low(), pairs[0].high()), (0, 1));
}

#[test]
fn domain_removal_compares_mailbox_names_only() {
    let graph = InMemoryGraph::with_vertex_text(
        "Email",
        [(0, "jsmith@alpha.example"), (1, "jsmith@beta.example"), (2, "kjones@alpha.example")],
    );
    let config = AnalysisConfig::new("Email")
        .with_threshold(1.0)
        .with_remove_domain(true);
    let pairs = ContentAnalysis::new(config).unwrap().pairwise_similarities(&graph).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].low(), pairs[0].high()), (0, 1));
}

#[test]
fn selected_scope_limits_clustering_input() {
    let mut graph = desserts();
    graph.select(ElementType::Vertex, 1);
    graph.select(ElementType::Vertex, 3);
    let config = AnalysisConfig::new("Label")
        .with_element_scope(ElementScope::SelectedOnly)
        .with_threshold(1.0)
        .with_number_of_means(2)
        .with_seed(1);
    let fit = ContentAnalysis::new(config).unwrap().cluster_documents(&graph).unwrap();
    assert_eq!(fit.assignment.len(), 2);
    assert_eq!(fit.assignment.get(2), None);
}

#[test]
fn configuration_round_trips_through_json() {
    let json = r#"{
        "attribute": "Label",
        "tokenizing_method": "n_grams",
        "token_length": 5,
        "threshold": 0.0,
        "similarity": "binary_taxicab"
    }"#;
    let config = AnalysisConfig::from_json(json).unwrap();
    assert_eq!(config, five_grams());
    let pairs = ContentAnalysis::new(config).unwrap().pairwise_similarities(&desserts()).unwrap();
    assert_eq!(pairs.len(), 1);
}
