//! # cryptic-core
//!
//! Core types, traits, and errors shared by the cryptic inositol-phosphate
//! (IP) binding site screening crates.
//!
//! - **Types**: pocket measurements, normalized metrics, scored pockets and
//!   per-structure analysis results
//! - **Source**: the `MeasurementSource` boundary through which external
//!   pocket detection and biophysics tools hand measurements to the core
//! - **Errors**: unified error handling with `CrypticError`
//!
//! ```text
//! ┌──────────────────┐
//! │  cryptic-core    │  ← types / errors / source trait
//! └──────────────────┘
//!          ▲
//!    ┌─────┴──────────────┐
//!    │                    │
//! ┌──▼──────────────┐  ┌──▼─────────────────┐
//! │ cryptic-scoring │◄─┤ cryptic-validation │
//! └─────────────────┘  └────────────────────┘
//! ```

pub mod errors;
pub mod source;
pub mod types;

pub use errors::{CrypticError, Result};
pub use source::{InMemorySource, MeasuredStructure, MeasurementSource};
pub use types::{
    AnalysisResult, Metric, NormalizedMetrics, PocketMeasurement, PocketRejection, ScoredPocket,
    SiteClass, StructureMetadata, Verdict,
};
