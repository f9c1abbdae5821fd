// src/analyze/mod.rs
//! Clustering and ranking core: similarity, seed-based clustering, interest and order.

pub mod cluster;
pub mod rank;
pub mod scoring;
pub mod similarity;

pub use cluster::{cluster, cluster_with, publishable, ClusterParams};
pub use rank::{parse_timestamp, rank, rank_one, RankedBlink};
pub use scoring::interest;
pub use similarity::{similarity, similarity_with, SimilarityParams};
