//! Separation statistics for control validation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fraction of `expected` residues present in `lining`.
///
/// `None` when nothing is expected, so the check is vacuous.
pub fn overlap_fraction(expected: &[i32], lining: &[i32]) -> Option<f64> {
    let expected: HashSet<i32> = expected.iter().copied().collect();
    if expected.is_empty() {
        return None;
    }
    let lining: HashSet<i32> = lining.iter().copied().collect();
    let hits = expected.intersection(&lining).count();
    Some(hits as f64 / expected.len() as f64)
}

/// Worst-case separation: weakest passing positive vs. strongest negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeparationStats {
    /// Lowest top-pocket score among positives whose top pocket passed
    pub min_positive: Option<f64>,
    /// Highest score of any pocket of any negative control
    pub max_negative: Option<f64>,
    /// `min_positive - max_negative`; positive means the populations separate
    pub separation: Option<f64>,
}

impl SeparationStats {
    pub fn compute(passing_positive_tops: &[f64], negative_pockets: &[f64]) -> Self {
        let min_positive = passing_positive_tops.iter().copied().reduce(f64::min);
        let max_negative = negative_pockets.iter().copied().reduce(f64::max);
        let separation = match (min_positive, max_negative) {
            (Some(p), Some(n)) => Some(p - n),
            _ => None,
        };
        Self {
            min_positive,
            max_negative,
            separation,
        }
    }

    pub fn is_separated(&self) -> bool {
        self.separation.map_or(false, |s| s > 0.0)
    }
}

/// Mean top-pocket scores of both populations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanSeparation {
    pub positive_mean: f64,
    pub negative_mean: f64,
    pub difference: f64,
    /// Difference above 0.3
    pub clear_separation: bool,
}

impl MeanSeparation {
    /// `None` unless both populations have at least one score.
    pub fn compute(positive_tops: &[f64], negative_tops: &[f64]) -> Option<Self> {
        let positive_mean = mean(positive_tops)?;
        let negative_mean = mean(negative_tops)?;
        let difference = positive_mean - negative_mean;
        Some(Self {
            positive_mean,
            negative_mean,
            difference,
            clear_separation: difference > 0.3,
        })
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_fraction() {
        let expected = [376, 519, 522, 651, 672];
        assert_eq!(overlap_fraction(&expected, &[376, 519, 522, 100]), Some(0.6));
        assert_eq!(overlap_fraction(&expected, &[]), Some(0.0));
        assert_eq!(overlap_fraction(&[], &[1, 2]), None);
    }

    #[test]
    fn test_separation() {
        let stats = SeparationStats::compute(&[0.87, 0.78], &[0.07, 0.31, 0.12]);
        assert!((stats.separation.unwrap() - 0.47).abs() < 1e-12);
        assert!(stats.is_separated());

        let overlapping = SeparationStats::compute(&[0.72], &[0.75]);
        assert!(!overlapping.is_separated());

        let empty = SeparationStats::compute(&[], &[0.2]);
        assert_eq!(empty.separation, None);
        assert_eq!(empty.max_negative, Some(0.2));
    }

    #[test]
    fn test_mean_separation() {
        let m = MeanSeparation::compute(&[0.87, 0.73], &[0.07, 0.13]).unwrap();
        assert!((m.positive_mean - 0.80).abs() < 1e-12);
        assert!((m.negative_mean - 0.10).abs() < 1e-12);
        assert!(m.clear_separation);
        assert!(MeanSeparation::compute(&[], &[0.1]).is_none());
    }
}
