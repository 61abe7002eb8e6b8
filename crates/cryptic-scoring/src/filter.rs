//! Candidate thresholding and ranking
//!
//! Pockets are sorted by composite score (descending, ties by ascending
//! pocket id), marked against the score threshold and, optionally, against
//! hard physical cutoffs and a per-residue confidence gate.

use cryptic_core::{
    AnalysisResult, PocketMeasurement, PocketRejection, ScoredPocket, StructureMetadata, Verdict,
};
use cryptic_core::{CrypticError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Hard cutoffs a cryptic IP pocket is expected to meet.
///
/// Pockets that miss them keep their score but carry
/// `meets_criteria = Some(false)` and cannot make a structure a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaFilter {
    /// Minimum Arg/Lys/His count around the pocket
    pub min_basic_residues: u32,
    /// Maximum pocket SASA (Å²)
    pub max_sasa: f64,
    /// Accepted volume range (Å³)
    pub min_volume: f64,
    pub max_volume: f64,
}

impl Default for CriteriaFilter {
    fn default() -> Self {
        Self {
            min_basic_residues: 4,
            max_sasa: 10.0,
            min_volume: 300.0,
            max_volume: 800.0,
        }
    }
}

impl CriteriaFilter {
    pub fn validate(&self) -> Result<()> {
        if !self.max_sasa.is_finite() || self.max_sasa < 0.0 {
            return Err(CrypticError::config(format!(
                "criteria.max_sasa must be finite and >= 0, got {}",
                self.max_sasa
            )));
        }
        if !(self.min_volume.is_finite() && self.max_volume.is_finite())
            || self.min_volume < 0.0
            || self.min_volume > self.max_volume
        {
            return Err(CrypticError::config(format!(
                "criteria volume range [{}, {}] is invalid",
                self.min_volume, self.max_volume
            )));
        }
        Ok(())
    }

    /// Names of the cutoffs a pocket misses; empty when it meets all of them.
    pub fn failures(&self, pocket: &PocketMeasurement) -> Vec<String> {
        let mut failed = Vec::new();
        if pocket.basic_residues < self.min_basic_residues {
            failed.push(format!(
                "basic residues {} < {}",
                pocket.basic_residues, self.min_basic_residues
            ));
        }
        if pocket.sasa > self.max_sasa {
            failed.push(format!("SASA {:.1} > {:.1}", pocket.sasa, self.max_sasa));
        }
        if pocket.volume < self.min_volume || pocket.volume > self.max_volume {
            failed.push(format!(
                "volume {:.0} outside {:.0}-{:.0}",
                pocket.volume, self.min_volume, self.max_volume
            ));
        }
        failed
    }

    pub fn check(&self, pocket: &PocketMeasurement) -> bool {
        self.failures(pocket).is_empty()
    }
}

/// Score threshold, confidence gate and optional hard criteria.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub score_threshold: f64,
    /// Mean pLDDT below this marks a pocket `low_confidence`
    pub confidence_threshold: f64,
    pub criteria: Option<CriteriaFilter>,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            score_threshold: 0.70,
            confidence_threshold: 70.0,
            criteria: None,
        }
    }
}

impl CandidateFilter {
    pub fn new(score_threshold: f64) -> Self {
        Self {
            score_threshold,
            ..Default::default()
        }
    }

    pub fn with_criteria(mut self, criteria: CriteriaFilter) -> Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Attach criteria and confidence flags, then threshold and rank.
    pub fn apply(
        &self,
        structure: StructureMetadata,
        mut pockets: Vec<ScoredPocket>,
        rejected: Vec<PocketRejection>,
    ) -> AnalysisResult {
        let gate = structure.residue_confidence.is_some();
        for pocket in &mut pockets {
            if let Some(criteria) = &self.criteria {
                pocket.meets_criteria = Some(criteria.check(&pocket.measurement));
            }
            if gate {
                pocket.mean_confidence =
                    structure.mean_confidence(&pocket.measurement.lining_residues);
                pocket.low_confidence = pocket
                    .mean_confidence
                    .map(|c| c < self.confidence_threshold)
                    .unwrap_or(false);
            }
        }

        let mut result = filter_and_rank(structure, pockets, self.score_threshold);
        result.rejected = rejected;
        result
    }
}

/// Sort, rank and threshold scored pockets into an `AnalysisResult`.
///
/// An empty pocket list is a valid outcome with verdict `NoPockets`.
pub fn filter_and_rank(
    structure: StructureMetadata,
    mut pockets: Vec<ScoredPocket>,
    score_threshold: f64,
) -> AnalysisResult {
    pockets.sort_by(rank_order);
    for (i, pocket) in pockets.iter_mut().enumerate() {
        pocket.rank = i + 1;
        pocket.passed_threshold = pocket.score >= score_threshold;
    }

    let verdict = verdict_of(&pockets);
    debug!(
        "{}: {} pockets ranked, verdict {:?}",
        structure.accession,
        pockets.len(),
        verdict
    );

    AnalysisResult {
        structure,
        pockets,
        rejected: Vec::new(),
        score_threshold,
        verdict,
    }
}

fn rank_order(a: &ScoredPocket, b: &ScoredPocket) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.id().cmp(&b.id()))
}

fn verdict_of(pockets: &[ScoredPocket]) -> Verdict {
    if pockets.is_empty() {
        return Verdict::NoPockets;
    }
    let passing: Vec<&ScoredPocket> = pockets.iter().filter(|p| p.passed_threshold).collect();
    if passing
        .iter()
        .any(|p| !p.low_confidence && p.meets_criteria != Some(false))
    {
        Verdict::Candidate
    } else if passing.iter().any(|p| p.low_confidence) {
        Verdict::LowConfidence
    } else {
        Verdict::Rejected
    }
}
