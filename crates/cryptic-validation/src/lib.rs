//! # cryptic-validation
//!
//! Checks a scoring configuration against proteins whose inositol-phosphate
//! sites are known, before it is trusted on a proteome.
//!
//! - [`controls`]: built-in and file-based positive/negative control sets
//! - [`suite`]: runs the controls through the scoring pipeline and reports
//!   per-control verdicts plus population separation
//! - [`structure`] and [`kabsch_alignment`]: PDB coordinates, pLDDT and
//!   superposed RMSD for model-vs-reference checks

pub mod controls;
pub mod kabsch_alignment;
pub mod metrics;
pub mod structure;
pub mod suite;

pub use controls::{
    builtin_negative_controls, builtin_positive_controls, ControlCase, ControlKind, ControlSet,
    CriterionCheck, StructuralCheck, SuccessCriteria, ADAR2_IP6_RESIDUES,
};
pub use kabsch_alignment::{compute_centroid, compute_rmsd, kabsch_align, superposed_rmsd, Alignment};
pub use metrics::{overlap_fraction, MeanSeparation, SeparationStats};
pub use structure::{calculate_rmsd, AtomRecord, ResidueSelection, StructureCoords};
pub use suite::{ValidationRecord, ValidationReport, ValidationSuite};
