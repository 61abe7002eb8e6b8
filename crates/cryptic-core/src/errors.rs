//! Error types for cryptic site screening.
//!
//! Per-pocket and per-structure failures are captured by the scoring and
//! batch layers and attached to results; configuration failures propagate
//! immediately and halt a run before any scoring begins.

use thiserror::Error;

use crate::types::Metric;

/// Unified error type for all screening operations.
#[derive(Error, Debug)]
pub enum CrypticError {
    /// A pocket measurement is missing a required value or holds a value
    /// outside its physical domain (NaN, infinite, negative volume, ...)
    #[error("Invalid metric '{metric}' for pocket {pocket_id}: {reason}")]
    InvalidMetric {
        pocket_id: u32,
        metric: Metric,
        reason: String,
    },

    /// Malformed score weights (negative, unknown metric, zero sum)
    #[error("Invalid weight configuration: {0}")]
    InvalidWeight(String),

    /// Any other configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Coordinate sets cannot be superposed
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// The external collaborator failed to produce measurements for a structure
    #[error("Structure '{structure_id}' failed: {message}")]
    StructureProcessing {
        structure_id: String,
        message: String,
    },

    /// A resumed run conflicts with the persisted checkpoint
    #[error("Checkpoint inconsistency: {0}")]
    CheckpointInconsistency(String),

    /// Coordinate file could not be interpreted
    #[error("PDB parse error: {0}")]
    PdbParse(String),

    /// I/O errors (checkpoint files, measurement files, reports)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("TOML error: {0}")]
    Toml(String),

    /// CSV report could not be written
    #[error("CSV error: {0}")]
    Csv(String),
}

impl CrypticError {
    /// Creates an invalid metric error.
    pub fn invalid_metric(pocket_id: u32, metric: Metric, reason: impl Into<String>) -> Self {
        CrypticError::InvalidMetric {
            pocket_id,
            metric,
            reason: reason.into(),
        }
    }

    /// Creates an invalid weight error.
    pub fn invalid_weight(message: impl Into<String>) -> Self {
        CrypticError::InvalidWeight(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        CrypticError::Config(message.into())
    }

    /// Creates an alignment error.
    pub fn alignment(message: impl Into<String>) -> Self {
        CrypticError::Alignment(message.into())
    }

    /// Creates a structure processing error.
    pub fn structure(structure_id: impl Into<String>, message: impl Into<String>) -> Self {
        CrypticError::StructureProcessing {
            structure_id: structure_id.into(),
            message: message.into(),
        }
    }

    /// Creates a checkpoint inconsistency error.
    pub fn checkpoint(message: impl Into<String>) -> Self {
        CrypticError::CheckpointInconsistency(message.into())
    }

    /// Creates a PDB parse error.
    pub fn pdb(message: impl Into<String>) -> Self {
        CrypticError::PdbParse(message.into())
    }

    /// Creates a TOML parse error.
    pub fn toml(message: impl Into<String>) -> Self {
        CrypticError::Toml(message.into())
    }

    /// Creates a CSV export error.
    pub fn csv(message: impl Into<String>) -> Self {
        CrypticError::Csv(message.into())
    }

    /// Errors scoped to a single pocket or structure.
    ///
    /// These are recorded against the affected record and never abort a
    /// batch or a validation suite.
    pub fn is_per_structure(&self) -> bool {
        matches!(
            self,
            CrypticError::InvalidMetric { .. }
                | CrypticError::StructureProcessing { .. }
                | CrypticError::Alignment(_)
                | CrypticError::PdbParse(_)
        )
    }

    /// Errors that must stop a run before any work proceeds.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrypticError::InvalidWeight(_)
                | CrypticError::Config(_)
                | CrypticError::Toml(_)
                | CrypticError::CheckpointInconsistency(_)
        )
    }

    /// Returns a user-facing message with a hint on how to fix the problem.
    pub fn user_message(&self) -> String {
        match self {
            CrypticError::InvalidWeight(msg) => format!(
                "Invalid weight configuration: {}\n\
                 → Weights must be non-negative, name only volume/depth/sasa/potential/basic_residues,\n\
                 → and have a positive sum.",
                msg
            ),
            CrypticError::Config(msg) | CrypticError::Toml(msg) => format!(
                "Configuration error: {}\n\
                 → Review the TOML file; thresholds are fractions in [0, 1] and confidence is pLDDT in [0, 100].",
                msg
            ),
            CrypticError::CheckpointInconsistency(msg) => format!(
                "Checkpoint inconsistency: {}\n\
                 → Resume with the original structure list, or start a fresh checkpoint file.",
                msg
            ),
            other => other.to_string(),
        }
    }
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CrypticError>;
