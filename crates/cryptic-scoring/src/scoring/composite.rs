//! Composite cryptic-site scoring
//!
//! score = Σ weight_i × normalized_i over the five pocket metrics, with
//! weights rescaled to sum to 1.0 so the score stays in [0, 1].

use cryptic_core::{Metric, NormalizedMetrics, Result, SiteClass};
use std::collections::BTreeMap;

use super::ScoreWeights;

/// Weighted-sum scorer over normalized metrics.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: ScoreWeights,
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
        }
    }
}

impl CompositeScorer {
    /// Validates the weights and normalizes them to sum to 1.0.
    pub fn new(weights: ScoreWeights) -> Result<Self> {
        Ok(Self {
            weights: weights.normalized()?,
        })
    }

    /// Effective (normalized) weights.
    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// A metric missing from `normalized` contributes 0.0.
    pub fn score(&self, normalized: &NormalizedMetrics) -> f64 {
        self.weights
            .iter()
            .map(|(metric, weight)| weight * normalized.get(metric).unwrap_or(0.0))
            .sum()
    }

    /// Per-metric contribution to the composite score.
    pub fn contributions(&self, normalized: &NormalizedMetrics) -> BTreeMap<Metric, f64> {
        self.weights
            .iter()
            .map(|(metric, weight)| (metric, weight * normalized.get(metric).unwrap_or(0.0)))
            .collect()
    }
}

/// Score one set of normalized metrics under `weights`.
pub fn score(normalized: &NormalizedMetrics, weights: &ScoreWeights) -> Result<f64> {
    Ok(CompositeScorer::new(weights.clone())?.score(normalized))
}

/// Confidence band for a composite score.
pub fn classify_site(score: f64) -> SiteClass {
    if score >= 0.75 {
        SiteClass::HighConfidence
    } else if score >= 0.60 {
        SiteClass::ModerateConfidence
    } else if score >= 0.40 {
        SiteClass::LowConfidence
    } else {
        SiteClass::Unlikely
    }
}
