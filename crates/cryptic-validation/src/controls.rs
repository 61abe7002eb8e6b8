//! Positive and negative control proteins
//!
//! Positive controls bury an inositol phosphate inside the fold; negative
//! controls bind it on a surface-exposed PH domain. A sound scoring setup
//! ranks every positive above every negative.

use cryptic_core::{CrypticError, Result, ScoredPocket};
use cryptic_scoring::CriteriaFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::structure::ResidueSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Positive,
    Negative,
}

/// Per-metric checks on a positive control's top pocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessCriteria {
    pub min_score: f64,
    pub cutoffs: CriteriaFilter,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self {
            min_score: 0.70,
            cutoffs: CriteriaFilter::default(),
        }
    }
}

/// Outcome of one named criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionCheck {
    pub name: String,
    pub passed: bool,
}

impl SuccessCriteria {
    /// Evaluate every criterion; all are reported, passing or not.
    pub fn check(&self, pocket: &ScoredPocket) -> Vec<CriterionCheck> {
        let m = &pocket.measurement;
        let c = &self.cutoffs;
        vec![
            CriterionCheck {
                name: format!("score >= {:.2}", self.min_score),
                passed: pocket.score >= self.min_score,
            },
            CriterionCheck {
                name: format!("SASA < {:.1}", c.max_sasa),
                passed: m.sasa < c.max_sasa,
            },
            CriterionCheck {
                name: format!("basic residues >= {}", c.min_basic_residues),
                passed: m.basic_residues >= c.min_basic_residues,
            },
            CriterionCheck {
                name: format!("volume {:.0}-{:.0}", c.min_volume, c.max_volume),
                passed: (c.min_volume..=c.max_volume).contains(&m.volume),
            },
        ]
    }
}

/// Model/reference superposition attached to a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralCheck {
    pub model: PathBuf,
    pub reference: PathBuf,
    #[serde(default)]
    pub selection: ResidueSelection,
    /// Largest acceptable RMSD (Å)
    pub max_rmsd: f64,
}

/// A labelled control protein.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCase {
    pub name: String,
    /// Identifier passed to the measurement source
    pub structure_id: String,
    pub kind: ControlKind,
    #[serde(default)]
    pub pdb_id: Option<String>,
    #[serde(default)]
    pub ip_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Score the control is expected to reach (informational)
    #[serde(default)]
    pub expected_score: Option<f64>,
    /// Residues coordinating the ligand in the experimental structure
    #[serde(default)]
    pub expected_residues: Vec<i32>,
    #[serde(default)]
    pub success_criteria: Option<SuccessCriteria>,
    #[serde(default)]
    pub structural_check: Option<StructuralCheck>,
}

impl ControlCase {
    pub fn positive(name: impl Into<String>, structure_id: impl Into<String>) -> Self {
        Self::new(name, structure_id, ControlKind::Positive)
    }

    pub fn negative(name: impl Into<String>, structure_id: impl Into<String>) -> Self {
        Self::new(name, structure_id, ControlKind::Negative)
    }

    fn new(name: impl Into<String>, structure_id: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: name.into(),
            structure_id: structure_id.into(),
            kind,
            pdb_id: None,
            ip_type: None,
            description: None,
            expected_score: None,
            expected_residues: Vec::new(),
            success_criteria: None,
            structural_check: None,
        }
    }

    pub fn with_pdb(mut self, pdb_id: &str, ip_type: &str) -> Self {
        self.pdb_id = Some(pdb_id.to_string());
        self.ip_type = Some(ip_type.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_expected_score(mut self, score: f64) -> Self {
        self.expected_score = Some(score);
        self
    }

    pub fn with_expected_residues(mut self, residues: impl Into<Vec<i32>>) -> Self {
        self.expected_residues = residues.into();
        self
    }

    pub fn with_success_criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.success_criteria = Some(criteria);
        self
    }

    pub fn with_structural_check(mut self, check: StructuralCheck) -> Self {
        self.structural_check = Some(check);
        self
    }

    pub fn is_positive(&self) -> bool {
        self.kind == ControlKind::Positive
    }
}

/// ADAR2 IP6 coordinating residues (K376, K519, R522, R651, K672).
pub const ADAR2_IP6_RESIDUES: [i32; 5] = [376, 519, 522, 651, 672];

/// Known buried IP sites.
pub fn builtin_positive_controls() -> Vec<ControlCase> {
    vec![
        ControlCase::positive("ADAR2", "AF-P78563-F1")
            .with_pdb("1ZY7", "IP6")
            .with_description("Gold standard - completely buried IP6")
            .with_expected_score(0.75)
            .with_expected_residues(ADAR2_IP6_RESIDUES)
            .with_success_criteria(SuccessCriteria::default()),
        ControlCase::positive("Pds5B", "5HDT")
            .with_pdb("5HDT", "IP6")
            .with_description("Cohesin regulator with buried IP6")
            .with_expected_score(0.65),
        ControlCase::positive("HDAC1", "5ICN")
            .with_pdb("5ICN", "IP4")
            .with_description("Histone deacetylase with IP4 at interface")
            .with_expected_score(0.60),
    ]
}

/// Surface-exposed PH-domain IP sites.
pub fn builtin_negative_controls() -> Vec<ControlCase> {
    vec![
        ControlCase::negative("PLCd1_PH", "1MAI")
            .with_pdb("1MAI", "IP3")
            .with_description("Classic surface-exposed PH domain")
            .with_expected_score(0.30),
        ControlCase::negative("Btk_PH", "1BTK")
            .with_pdb("1BTK", "IP4")
            .with_description("Kinase PH domain - membrane targeting")
            .with_expected_score(0.35),
    ]
}

/// Positive and negative controls for one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSet {
    #[serde(default)]
    pub positives: Vec<ControlCase>,
    #[serde(default)]
    pub negatives: Vec<ControlCase>,
}

impl ControlSet {
    pub fn builtin() -> Self {
        Self {
            positives: builtin_positive_controls(),
            negatives: builtin_negative_controls(),
        }
    }

    /// Load a control set; relative structural-check paths resolve against
    /// the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut set: ControlSet = serde_json::from_str(&content)?;
        set.check_kinds()?;
        if let Some(base) = path.parent() {
            for case in set.positives.iter_mut().chain(set.negatives.iter_mut()) {
                if let Some(check) = case.structural_check.as_mut() {
                    check.model = base.join(&check.model);
                    check.reference = base.join(&check.reference);
                }
            }
        }
        Ok(set)
    }

    fn check_kinds(&self) -> Result<()> {
        let misfiled = self
            .positives
            .iter()
            .find(|c| c.kind != ControlKind::Positive)
            .or_else(|| {
                self.negatives
                    .iter()
                    .find(|c| c.kind != ControlKind::Negative)
            });
        match misfiled {
            Some(case) => Err(CrypticError::config(format!(
                "control '{}' is listed under the wrong kind",
                case.name
            ))),
            None => Ok(()),
        }
    }
}
