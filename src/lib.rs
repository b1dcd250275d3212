//! Token-based similarity and clustering over graph element text.
//!
//! `tokensim` reads a string attribute from every node (or edge) of a host
//! graph, tokenizes it, and either
//! - finds similar element pairs ([`similarity`]), optionally merging them into
//!   clusters,
//! - clusters the elements' weighted token vectors with k-means ([`cluster`]), or
//! - counts the words and nearby-word phrases of each element
//!   ([`tokenize::PhraseTokenizer`], [`handler::PhraseTokenHandler`]).
//!
//! Results go back to the graph as cluster labels, named selections or
//! similarity edges ([`followup`]). [`analysis::ContentAnalysis`] drives a whole
//! run from an [`config::AnalysisConfig`].
//!
//! Work is split into chunks by [`partition::WorkPartitioner`] and run on scoped
//! threads, one barrier-synchronized phase at a time.

#![forbid(unsafe_code)]

pub mod analysis;
pub mod cluster;
pub mod config;
pub mod error;
pub mod followup;
pub mod graph;
pub mod handler;
pub mod matrix;
pub mod partition;
pub mod similarity;
pub mod tokenize;

pub use analysis::{AnalysisResult, ContentAnalysis, RunState};
pub use cluster::{ClusterAssignment, Clustering, Kmeans, KmeansFit, MergeClustering, VectorSpace};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use followup::FollowUpOutcome;
pub use similarity::{ElementSimilarity, PairwiseSimilarityService, SimilarityMethod};
