//! Shared data model for pocket scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Physical metrics measured for every pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Pocket volume (Å³)
    Volume,
    /// Burial depth from the molecular surface (Å)
    Depth,
    /// Solvent-accessible surface area of the pocket (Å²)
    Sasa,
    /// Electrostatic potential at the pocket center (kT/e)
    Potential,
    /// Arg/Lys/His residues within the coordination radius
    BasicResidues,
}

impl Metric {
    /// Every metric, in scoring order.
    pub const ALL: [Metric; 5] = [
        Metric::Volume,
        Metric::Depth,
        Metric::Sasa,
        Metric::Potential,
        Metric::BasicResidues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Volume => "volume",
            Metric::Depth => "depth",
            Metric::Sasa => "sasa",
            Metric::Potential => "potential",
            Metric::BasicResidues => "basic_residues",
        }
    }

    /// Resolve a metric from its canonical name or a common alias.
    pub fn from_name(name: &str) -> Option<Metric> {
        match name.trim().to_ascii_lowercase().as_str() {
            "volume" => Some(Metric::Volume),
            "depth" => Some(Metric::Depth),
            "sasa" => Some(Metric::Sasa),
            "potential" | "electrostatics" => Some(Metric::Potential),
            "basic_residues" | "basic_count" => Some(Metric::BasicResidues),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw measurements of one detected cavity, as produced by the external
/// pocket detection collaborator. Immutable within an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PocketMeasurement {
    /// Pocket identifier, 1-indexed within its structure
    pub id: u32,
    /// Volume (Å³), must be > 0
    pub volume: f64,
    /// Depth (Å), must be >= 0
    pub depth: f64,
    /// Solvent-accessible surface area (Å²), must be >= 0
    pub sasa: f64,
    /// Electrostatic potential at the pocket center (kT/e); absent when
    /// electrostatics were not computed
    #[serde(default)]
    pub potential: Option<f64>,
    /// Count of Arg/Lys/His residues near the pocket
    pub basic_residues: u32,
    /// Pocket center (Å)
    #[serde(default)]
    pub center: [f64; 3],
    /// Residue numbers lining the pocket
    #[serde(default)]
    pub lining_residues: Vec<i32>,
}

impl PocketMeasurement {
    /// Raw value of a metric; `None` only for an absent potential.
    pub fn raw(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Volume => Some(self.volume),
            Metric::Depth => Some(self.depth),
            Metric::Sasa => Some(self.sasa),
            Metric::Potential => self.potential,
            Metric::BasicResidues => Some(self.basic_residues as f64),
        }
    }
}

/// Per-pocket desirability values in [0, 1], keyed by metric.
///
/// Always recomputed from a `PocketMeasurement` under a normalization
/// configuration; never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    values: BTreeMap<Metric, f64>,
}

impl NormalizedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: Metric, value: f64) {
        self.values.insert(metric, value);
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Metric, f64)> for NormalizedMetrics {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Confidence band of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteClass {
    HighConfidence,
    ModerateConfidence,
    LowConfidence,
    Unlikely,
}

impl Default for SiteClass {
    fn default() -> Self {
        SiteClass::Unlikely
    }
}

impl SiteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteClass::HighConfidence => "High confidence cryptic IP site",
            SiteClass::ModerateConfidence => "Moderate confidence candidate",
            SiteClass::LowConfidence => "Low confidence - manual inspection recommended",
            SiteClass::Unlikely => "Unlikely cryptic IP site",
        }
    }
}

impl fmt::Display for SiteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pocket together with its composite score and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPocket {
    pub measurement: PocketMeasurement,
    pub normalized: NormalizedMetrics,
    /// Weighted composite score, nominally in [0, 1]
    pub score: f64,
    /// `score >= score_threshold`
    pub passed_threshold: bool,
    pub classification: SiteClass,
    /// Outcome of the optional hard-criteria filter
    #[serde(default)]
    pub meets_criteria: Option<bool>,
    /// Mean per-residue confidence (pLDDT) over the lining residues
    #[serde(default)]
    pub mean_confidence: Option<f64>,
    /// Mean confidence fell below the quality gate
    #[serde(default)]
    pub low_confidence: bool,
    /// 1-based rank within the structure (0 until ranked)
    #[serde(default)]
    pub rank: usize,
}

impl ScoredPocket {
    pub fn id(&self) -> u32 {
        self.measurement.id
    }
}

/// Source-structure metadata supplied by the structure metadata collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureMetadata {
    /// Structure identifier (UniProt accession, AlphaFold id or PDB code)
    pub accession: String,
    #[serde(default)]
    pub protein_name: Option<String>,
    /// Per-residue confidence (pLDDT, 0-100); index `i` holds residue `i + 1`
    #[serde(default)]
    pub residue_confidence: Option<Vec<f64>>,
}

impl StructureMetadata {
    pub fn new(accession: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            ..Default::default()
        }
    }

    /// Confidence of a residue, if recorded.
    pub fn confidence_of(&self, residue: i32) -> Option<f64> {
        let confidence = self.residue_confidence.as_ref()?;
        if residue < 1 {
            return None;
        }
        confidence.get(residue as usize - 1).copied()
    }

    /// Mean confidence across a set of residues, ignoring unknown residues.
    pub fn mean_confidence(&self, residues: &[i32]) -> Option<f64> {
        let values: Vec<f64> = residues
            .iter()
            .filter_map(|&r| self.confidence_of(r))
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// A pocket excluded from scoring, with its cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PocketRejection {
    pub pocket_id: u32,
    pub reason: String,
}

/// Structure-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// At least one confident pocket passed the score threshold
    Candidate,
    /// Pockets passed the threshold, but only in low-confidence regions
    LowConfidence,
    /// No pocket passed the threshold
    Rejected,
    /// The detector reported no pockets at all
    NoPockets,
}

impl Verdict {
    pub fn is_candidate(&self) -> bool {
        matches!(self, Verdict::Candidate)
    }
}

/// Ranked, thresholded analysis of one structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub structure: StructureMetadata,
    /// Score descending, ties by ascending pocket id
    pub pockets: Vec<ScoredPocket>,
    /// Pockets that could not be scored
    #[serde(default)]
    pub rejected: Vec<PocketRejection>,
    pub score_threshold: f64,
    pub verdict: Verdict,
}

impl AnalysisResult {
    /// The top-scoring pocket; `None` marks a structure with no pockets.
    pub fn top_candidate(&self) -> Option<&ScoredPocket> {
        self.pockets.first()
    }

    pub fn has_pockets(&self) -> bool {
        !self.pockets.is_empty()
    }

    /// Pockets that passed the score threshold, in rank order.
    pub fn passing(&self) -> impl Iterator<Item = &ScoredPocket> {
        self.pockets.iter().filter(|p| p.passed_threshold)
    }

    /// The best `n` pockets.
    pub fn top_candidates(&self, n: usize) -> &[ScoredPocket] {
        &self.pockets[..n.min(self.pockets.len())]
    }

    /// Highest score of any pocket in the structure.
    pub fn max_score(&self) -> Option<f64> {
        self.top_candidate().map(|p| p.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_aliases() {
        assert_eq!(Metric::from_name("electrostatics"), Some(Metric::Potential));
        assert_eq!(Metric::from_name("Basic_Residues"), Some(Metric::BasicResidues));
        assert_eq!(Metric::from_name("hydrophobicity"), None);
        for metric in Metric::ALL {
            assert_eq!(Metric::from_name(metric.as_str()), Some(metric));
        }
    }

    #[test]
    fn test_mean_confidence_skips_unknown_residues() {
        let meta = StructureMetadata {
            accession: "P78563".into(),
            protein_name: None,
            residue_confidence: Some(vec![90.0, 80.0, 40.0]),
        };
        assert_eq!(meta.confidence_of(1), Some(90.0));
        assert_eq!(meta.confidence_of(0), None);
        let mean = meta.mean_confidence(&[1, 2, 99]).unwrap();
        assert!((mean - 85.0).abs() < 1e-12);
        assert_eq!(meta.mean_confidence(&[50]), None);
    }

    #[test]
    fn test_measurement_json_without_optional_fields() {
        let json = r#"{"id": 2, "volume": 640.0, "depth": 18.0, "sasa": 2.0, "basic_residues": 6}"#;
        let pocket: PocketMeasurement = serde_json::from_str(json).unwrap();
        assert_eq!(pocket.potential, None);
        assert!(pocket.lining_residues.is_empty());
        assert_eq!(pocket.raw(Metric::BasicResidues), Some(6.0));
    }
}
