//! Composite scoring engine for cryptic inositol-phosphate binding sites.
//!
//! Raw pocket measurements flow through three stages:
//!
//! 1. [`normalize`]: per-metric transfer functions map volume, depth, SASA,
//!    electrostatic potential and basic-residue count onto [0, 1]
//! 2. [`scoring`]: validated weights combine the normalized metrics into one
//!    composite score
//! 3. [`filter`]: pockets are thresholded and ranked into an
//!    `AnalysisResult`
//!
//! [`analyzer::PocketAnalyzer`] chains the three for one structure and
//! [`batch::BatchCoordinator`] fans the chain out over a proteome with
//! checkpoint/resume and fail-soft handling of individual structures.

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod filter;
pub mod normalize;
pub mod report;
pub mod scoring;

pub use analyzer::{count_by_class, PocketAnalyzer};
pub use batch::{
    read_measurements, BatchCoordinator, CheckpointEntry, CheckpointStore, JsonDirectorySource,
    JsonFileCheckpointStore, MemoryCheckpointStore, Outcome, ScreenReport, ScreenSummary,
    StopSignal, StructureFailure, StructureOutcome, StructureStage,
};
pub use config::ScreenConfig;
pub use filter::{filter_and_rank, CandidateFilter, CriteriaFilter};
pub use report::{
    by_max_score, collect_candidates, write_candidates_csv, write_candidates_csv_file, CandidateRow,
};
pub use normalize::{normalize, Direction, NormalizationConfig, Normalizer, TransferFunction};
pub use scoring::{classify_site, score, CompositeScorer, ScoreWeights};

pub use cryptic_core::{CrypticError, Result};
