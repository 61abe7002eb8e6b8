//! Composite score weights

use cryptic_core::{CrypticError, Metric, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-negative weight per metric.
///
/// Serialized as a metric-name table. A table may omit metrics (their weight
/// is 0.0) but may not name anything the normalizer does not produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ScoreWeights {
    pub volume: f64,
    pub depth: f64,
    pub sasa: f64,
    pub potential: f64,
    pub basic_residues: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volume: 0.05,
            depth: 0.25,
            sasa: 0.30,
            potential: 0.25,
            basic_residues: 0.15,
        }
    }
}

impl ScoreWeights {
    /// All-zero weights, to be filled with `set`.
    pub fn zero() -> Self {
        Self {
            volume: 0.0,
            depth: 0.0,
            sasa: 0.0,
            potential: 0.0,
            basic_residues: 0.0,
        }
    }

    /// Build weights from a name → weight table. Unknown names are an error,
    /// absent metrics get 0.0.
    pub fn from_map(table: &BTreeMap<String, f64>) -> Result<Self> {
        let mut weights = Self::zero();
        let mut seen: BTreeMap<Metric, &str> = BTreeMap::new();
        for (name, &value) in table {
            let metric = Metric::from_name(name).ok_or_else(|| {
                CrypticError::invalid_weight(format!(
                    "unknown metric '{}' (expected one of volume, depth, sasa, potential, basic_residues)",
                    name
                ))
            })?;
            if let Some(previous) = seen.insert(metric, name) {
                return Err(CrypticError::invalid_weight(format!(
                    "metric '{}' weighted twice ('{}' and '{}')",
                    metric, previous, name
                )));
            }
            weights.set(metric, value);
        }
        Ok(weights)
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Volume => self.volume,
            Metric::Depth => self.depth,
            Metric::Sasa => self.sasa,
            Metric::Potential => self.potential,
            Metric::BasicResidues => self.basic_residues,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Volume => self.volume = value,
            Metric::Depth => self.depth = value,
            Metric::Sasa => self.sasa = value,
            Metric::Potential => self.potential = value,
            Metric::BasicResidues => self.basic_residues = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }

    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, w)| w).sum()
    }

    /// Reject negative or non-finite weights and a non-positive sum.
    pub fn validate(&self) -> Result<()> {
        for (metric, weight) in self.iter() {
            if !weight.is_finite() {
                return Err(CrypticError::invalid_weight(format!(
                    "weight for '{}' is not finite",
                    metric
                )));
            }
            if weight < 0.0 {
                return Err(CrypticError::invalid_weight(format!(
                    "weight for '{}' is negative ({})",
                    metric, weight
                )));
            }
        }
        let sum = self.sum();
        if sum <= 0.0 {
            return Err(CrypticError::invalid_weight(format!(
                "weights sum to {}, cannot normalize",
                sum
            )));
        }
        Ok(())
    }

    /// Validated copy scaled to sum to 1.0.
    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        let sum = self.sum();
        let mut out = self.clone();
        for metric in Metric::ALL {
            out.set(metric, self.get(metric) / sum);
        }
        Ok(out)
    }
}

impl TryFrom<BTreeMap<String, f64>> for ScoreWeights {
    type Error = CrypticError;

    fn try_from(table: BTreeMap<String, f64>) -> Result<Self> {
        Self::from_map(&table)
    }
}

impl From<ScoreWeights> for BTreeMap<String, f64> {
    fn from(weights: ScoreWeights) -> Self {
        weights
            .iter()
            .map(|(m, w)| (m.as_str().to_string(), w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-12);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut w = ScoreWeights::default();
        w.depth = -0.1;
        assert!(matches!(w.validate(), Err(CrypticError::InvalidWeight(_))));
    }

    #[test]
    fn test_zero_sum_rejected() {
        assert!(matches!(
            ScoreWeights::zero().normalized(),
            Err(CrypticError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_normalized_rescales() {
        let mut w = ScoreWeights::zero();
        w.sasa = 2.0;
        w.depth = 2.0;
        let n = w.normalized().unwrap();
        assert!((n.sasa - 0.5).abs() < 1e-12);
        assert!((n.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_map_defaults_missing_to_zero() {
        let mut table = BTreeMap::new();
        table.insert("sasa".to_string(), 0.6);
        table.insert("electrostatics".to_string(), 0.4);
        let w = ScoreWeights::from_map(&table).unwrap();
        assert_eq!(w.potential, 0.4);
        assert_eq!(w.volume, 0.0);
    }

    #[test]
    fn test_from_map_rejects_unknown_and_duplicate_names() {
        let mut table = BTreeMap::new();
        table.insert("hydrophobicity".to_string(), 0.5);
        assert!(matches!(
            ScoreWeights::from_map(&table),
            Err(CrypticError::InvalidWeight(_))
        ));

        let mut table = BTreeMap::new();
        table.insert("potential".to_string(), 0.5);
        table.insert("electrostatics".to_string(), 0.5);
        assert!(ScoreWeights::from_map(&table).is_err());
    }
}
