pub mod answer;
pub mod chunker;
pub mod indexer;
