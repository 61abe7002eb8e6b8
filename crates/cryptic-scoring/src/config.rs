//! Screening configuration
//!
//! Serde-based TOML configuration for scoring, validation and batch
//! screening. Every recognized option is an explicit field with a
//! documented default; `validate()` runs before any scoring begins.

use cryptic_core::{CrypticError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::filter::{CandidateFilter, CriteriaFilter};
use crate::normalize::NormalizationConfig;
use crate::scoring::ScoreWeights;

/// Root configuration for scoring and screening runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Composite score a pocket must reach to pass (inclusive)
    pub score_threshold: f64,

    /// Mean pLDDT below which a pocket is flagged low-confidence
    pub confidence_threshold: f64,

    /// Structures completed between checkpoint flushes
    pub checkpoint_interval: usize,

    /// Worker threads for batch screening
    pub jobs: usize,

    /// Fraction of a positive control's expected residues the top pocket
    /// must line
    pub min_overlap_fraction: f64,

    /// Accept a resumed structure set that strictly extends the checkpoint
    pub allow_checkpoint_extension: bool,

    pub normalization: NormalizationConfig,

    pub weights: ScoreWeights,

    /// Hard cutoffs; disabled when absent
    pub criteria: Option<CriteriaFilter>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.70,
            confidence_threshold: 70.0,
            checkpoint_interval: 500,
            jobs: 1,
            min_overlap_fraction: 0.5,
            allow_checkpoint_extension: false,
            normalization: NormalizationConfig::default(),
            weights: ScoreWeights::default(),
            criteria: None,
        }
    }
}

impl ScreenConfig {
    /// Higher bar for follow-up candidate lists.
    pub fn strict() -> Self {
        Self {
            score_threshold: 0.75,
            ..Default::default()
        }
    }

    /// Permissive proteome-wide screening.
    pub fn exploratory() -> Self {
        Self {
            score_threshold: 0.60,
            ..Default::default()
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// The `[weights]` table is checked on its own so that a malformed
    /// weight set surfaces as `InvalidWeight` rather than a parse error.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| CrypticError::toml(e.to_string()))?;

        let weights = match table.remove("weights") {
            Some(value) => {
                let entries: BTreeMap<String, f64> = value.try_into().map_err(
                    |e: toml::de::Error| CrypticError::invalid_weight(e.to_string()),
                )?;
                ScoreWeights::from_map(&entries)?
            }
            None => ScoreWeights::default(),
        };

        let mut config: ScreenConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| CrypticError::toml(e.to_string()))?;
        config.weights = weights;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CrypticError::toml(e.to_string()))
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        check_fraction("score_threshold", self.score_threshold)?;
        check_fraction("min_overlap_fraction", self.min_overlap_fraction)?;
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(CrypticError::config(format!(
                "confidence_threshold must lie in [0, 100], got {}",
                self.confidence_threshold
            )));
        }
        if self.checkpoint_interval == 0 {
            return Err(CrypticError::config("checkpoint_interval must be >= 1"));
        }
        if self.jobs == 0 {
            return Err(CrypticError::config("jobs must be >= 1"));
        }
        self.normalization.validate()?;
        self.weights.validate()?;
        if let Some(criteria) = &self.criteria {
            criteria.validate()?;
        }
        Ok(())
    }

    /// Candidate filter carrying this configuration's thresholds.
    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter {
            score_threshold: self.score_threshold,
            confidence_threshold: self.confidence_threshold,
            criteria: self.criteria.clone(),
        }
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CrypticError::config(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ScreenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.score_threshold, 0.70);
        assert_eq!(config.checkpoint_interval, 500);
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_presets() {
        assert_eq!(ScreenConfig::strict().score_threshold, 0.75);
        assert_eq!(ScreenConfig::exploratory().score_threshold, 0.60);
        assert!(ScreenConfig::strict().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ScreenConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScreenConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ScreenConfig::from_toml_str(
            r#"
            score_threshold = 0.65
            jobs = 4

            [weights]
            sasa = 0.5
            depth = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.score_threshold, 0.65);
        assert_eq!(config.jobs, 4);
        assert_eq!(config.weights.sasa, 0.5);
        assert_eq!(config.weights.volume, 0.0);
        assert_eq!(config.confidence_threshold, 70.0);
    }

    #[test]
    fn test_negative_weight_is_invalid_weight() {
        let err = ScreenConfig::from_toml_str("[weights]\nsasa = -1.0\ndepth = 2.0\n").unwrap_err();
        assert!(matches!(err, CrypticError::InvalidWeight(_)));
    }

    #[test]
    fn test_unknown_weight_is_invalid_weight() {
        let err = ScreenConfig::from_toml_str("[weights]\nhydrophobicity = 1.0\n").unwrap_err();
        assert!(matches!(err, CrypticError::InvalidWeight(_)));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let err = ScreenConfig::from_toml_str("score_threshold = 1.5").unwrap_err();
        assert!(matches!(err, CrypticError::Config(_)));
        let err = ScreenConfig::from_toml_str("jobs = 0").unwrap_err();
        assert!(matches!(err, CrypticError::Config(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ScreenConfig::from_toml_str("score_threshold = ").unwrap_err();
        assert!(matches!(err, CrypticError::Toml(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = ScreenConfig::strict();
        config.criteria = Some(CriteriaFilter::default());
        config.normalization.missing_potential = Some(0.5);
        let text = config.to_toml_string().unwrap();
        assert_eq!(ScreenConfig::from_toml_str(&text).unwrap(), config);
    }
}
