//! Pairwise similarity and k-means over a handful of labelled vertices.
//!
//! Run with `RUST_LOG=debug` to see the phases.

use tokensim::config::{FollowUpChoice, TokenizingMethod};
use tokensim::graph::{ElementType, InMemoryGraph};
use tokensim::{AnalysisConfig, AnalysisResult, ContentAnalysis, SimilarityMethod};
use tracing_subscriber::EnvFilter;

fn main() -> tokensim::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let labels = [
        (0, "apple pie"),
        (1, "apple tart"),
        (2, "apple crumble"),
        (3, "banana split"),
        (4, "banana bread"),
        (5, "cherry tart"),
    ];

    // --- Similar pairs (5-grams, shared-token count) ---
    let mut graph = InMemoryGraph::with_vertex_text("Label", labels);
    let config = AnalysisConfig::new("Label")
        .with_tokenizing(TokenizingMethod::NGrams, 5)
        .with_threshold(0.0)
        .with_similarity(SimilarityMethod::BinaryTaxicab)
        .with_follow_up(FollowUpChoice::AddTransactions);
    let mut run = ContentAnalysis::new(config)?;
    let pairs = run.pairwise_similarities(&graph)?;
    println!("=== Similar pairs ===");
    for pair in &pairs {
        println!("  {:2} ~ {:2}  score {:.1}", pair.low(), pair.high(), pair.score());
    }
    let outcome = run.follow_up(&mut graph, &AnalysisResult::Pairs(pairs))?;
    println!("  edges: {outcome:?}");

    // --- K-means over word tokens (k=2) ---
    let mut graph = InMemoryGraph::with_vertex_text("Label", labels);
    let config = AnalysisConfig::new("Label")
        .with_tokenizing(TokenizingMethod::NWords, 1)
        .with_threshold(1.0)
        .with_number_of_means(2)
        .with_seed(42);
    let mut run = ContentAnalysis::new(config)?;
    let fit = run.cluster_documents(&graph)?;
    println!("\n=== K-means (k=2) ===");
    println!("  errors: {:?}", fit.errors);
    run.follow_up(&mut graph, &fit.into())?;
    if let Some(clusters) = graph.clusters(ElementType::Vertex) {
        for (element, cluster) in clusters {
            println!("  vertex {element} => cluster {cluster}");
        }
    }
    Ok(())
}
