// Analysis Module
// Originality analysis core organized into specialized submodules:
// - segmenter: overlapping word-window segmentation
// - similarity: TF-IDF cosine scoring of fragment/snippet pairs
// - pipeline: orchestrates segment -> retrieve -> score -> aggregate

pub mod pipeline;
pub mod segmenter;
pub mod similarity;

pub use pipeline::{AnalysisEngine, AnalysisError};
pub use segmenter::segment_fragments;
pub use similarity::similarity_percent;
