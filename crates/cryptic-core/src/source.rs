//! Boundary to the external pocket detection collaborator.
//!
//! fpocket, FreeSASA, APBS and structure downloads all live behind
//! `MeasurementSource`; the scoring core only ever sees the measurement
//! records they produce.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{CrypticError, Result};
use crate::types::{PocketMeasurement, PocketRejection, StructureMetadata};

/// Everything the core needs to know about one structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredStructure {
    pub metadata: StructureMetadata,
    #[serde(default)]
    pub pockets: Vec<PocketMeasurement>,
    /// Pockets reported by the collaborator that could not be read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<PocketRejection>,
}

impl MeasuredStructure {
    pub fn new(metadata: StructureMetadata, pockets: Vec<PocketMeasurement>) -> Self {
        Self {
            metadata,
            pockets,
            rejected: Vec::new(),
        }
    }

    pub fn with_rejected(mut self, rejected: Vec<PocketRejection>) -> Self {
        self.rejected = rejected;
        self
    }
}

/// Produces pocket measurements for a structure identifier.
///
/// Implementations must be shareable across worker threads; a failure is
/// reported as `CrypticError::StructureProcessing` and only affects the
/// requested structure.
pub trait MeasurementSource: Send + Sync {
    fn measure(&self, structure_id: &str) -> Result<MeasuredStructure>;
}

/// Measurements held in memory, keyed by structure id.
///
/// Counts every `measure` call so callers can tell how often the
/// collaborator was actually invoked.
#[derive(Debug, Default)]
pub struct InMemorySource {
    structures: HashMap<String, std::result::Result<MeasuredStructure, String>>,
    invocations: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register measurements under the structure's accession.
    pub fn insert(&mut self, structure: MeasuredStructure) {
        self.structures
            .insert(structure.metadata.accession.clone(), Ok(structure));
    }

    /// Register a structure whose measurement always fails.
    pub fn insert_failure(&mut self, structure_id: impl Into<String>, message: impl Into<String>) {
        self.structures
            .insert(structure_id.into(), Err(message.into()));
    }

    pub fn with(mut self, structure: MeasuredStructure) -> Self {
        self.insert(structure);
        self
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Number of `measure` calls so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl MeasurementSource for InMemorySource {
    fn measure(&self, structure_id: &str) -> Result<MeasuredStructure> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.structures.get(structure_id) {
            Some(Ok(structure)) => Ok(structure.clone()),
            Some(Err(message)) => Err(CrypticError::structure(structure_id, message.clone())),
            None => Err(CrypticError::structure(
                structure_id,
                "no measurements available",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_source_counts_calls() {
        let mut source = InMemorySource::new();
        source.insert(MeasuredStructure::new(StructureMetadata::new("Q1"), Vec::new()));
        source.insert_failure("Q2", "malformed PDB");

        assert!(source.measure("Q1").is_ok());
        let err = source.measure("Q2").unwrap_err();
        assert!(matches!(err, CrypticError::StructureProcessing { .. }));
        assert!(source.measure("missing").is_err());
        assert_eq!(source.invocations(), 3);
    }
}
