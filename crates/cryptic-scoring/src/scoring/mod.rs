//! Composite cryptic-site scoring

pub mod composite;
pub mod weights;

pub use composite::{classify_site, score, CompositeScorer};
pub use weights::ScoreWeights;
