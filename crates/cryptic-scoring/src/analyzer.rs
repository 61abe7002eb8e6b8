//! Per-structure analysis: normalize → score → filter.

use cryptic_core::{
    AnalysisResult, MeasuredStructure, PocketMeasurement, PocketRejection, Result, ScoredPocket,
    SiteClass,
};
use log::{debug, warn};

use crate::config::ScreenConfig;
use crate::filter::CandidateFilter;
use crate::normalize::Normalizer;
use crate::scoring::{classify_site, CompositeScorer};

/// Scores every pocket of a structure and ranks the result.
///
/// Stateless across calls; one analyzer is shared by all batch workers.
#[derive(Debug, Clone)]
pub struct PocketAnalyzer {
    normalizer: Normalizer,
    scorer: CompositeScorer,
    filter: CandidateFilter,
}

impl PocketAnalyzer {
    /// Build from a configuration, failing fast on invalid settings.
    pub fn new(config: &ScreenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: Normalizer::new(config.normalization.clone())?,
            scorer: CompositeScorer::new(config.weights.clone())?,
            filter: config.candidate_filter(),
        })
    }

    pub fn scorer(&self) -> &CompositeScorer {
        &self.scorer
    }

    pub fn score_threshold(&self) -> f64 {
        self.filter.score_threshold
    }

    /// Score one pocket; unranked and unflagged.
    pub fn score_pocket(&self, pocket: &PocketMeasurement) -> Result<ScoredPocket> {
        let normalized = self.normalizer.normalize(pocket)?;
        let score = self.scorer.score(&normalized);
        Ok(ScoredPocket {
            measurement: pocket.clone(),
            normalized,
            score,
            passed_threshold: false,
            classification: classify_site(score),
            meets_criteria: None,
            mean_confidence: None,
            low_confidence: false,
            rank: 0,
        })
    }

    /// Analyze one structure.
    ///
    /// A pocket with an invalid metric is recorded in `rejected`, after any
    /// rejections made while reading the measurements, and the remaining
    /// pockets still score.
    pub fn analyze(&self, structure: MeasuredStructure) -> AnalysisResult {
        let MeasuredStructure {
            metadata,
            pockets,
            mut rejected,
        } = structure;

        if metadata.residue_confidence.is_none() && !pockets.is_empty() {
            warn!(
                "{}: no per-residue confidence supplied, skipping confidence gating",
                metadata.accession
            );
        }

        let mut scored = Vec::with_capacity(pockets.len());
        for pocket in &pockets {
            match self.score_pocket(pocket) {
                Ok(p) => {
                    debug!(
                        "{} pocket {}: score {:.3} ({})",
                        metadata.accession,
                        p.id(),
                        p.score,
                        p.classification
                    );
                    scored.push(p);
                }
                Err(e) => {
                    warn!("{} pocket {} rejected: {}", metadata.accession, pocket.id, e);
                    rejected.push(PocketRejection {
                        pocket_id: pocket.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.filter.apply(metadata, scored, rejected)
    }
}

/// Count of pockets per classification band.
pub fn count_by_class<'a>(
    pockets: impl IntoIterator<Item = &'a ScoredPocket>,
) -> [(SiteClass, usize); 4] {
    let mut counts = [
        (SiteClass::HighConfidence, 0),
        (SiteClass::ModerateConfidence, 0),
        (SiteClass::LowConfidence, 0),
        (SiteClass::Unlikely, 0),
    ];
    for pocket in pockets {
        if let Some(slot) = counts.iter_mut().find(|(c, _)| *c == pocket.classification) {
            slot.1 += 1;
        }
    }
    counts
}
