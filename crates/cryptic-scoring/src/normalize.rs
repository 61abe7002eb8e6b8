//! Metric normalization
//!
//! Every raw metric is mapped onto a [0, 1] desirability scale by an
//! explicitly configured transfer function. Defaults follow the biological
//! criteria for buried IP3-IP6 sites:
//!
//! | Metric          | Function | Shape                                     |
//! |-----------------|----------|-------------------------------------------|
//! | volume          | window   | 1.0 on 300-800 Å³, linear fall-off outside |
//! | depth           | sigmoid  | increasing, center 15 Å, scale 2.0         |
//! | sasa            | sigmoid  | decreasing, center 5 Å², scale 1.5         |
//! | potential       | sigmoid  | increasing, center 5 kT/e, scale 1.25      |
//! | basic_residues  | sigmoid  | increasing, center 4, scale 1.0            |

use cryptic_core::{CrypticError, Metric, NormalizedMetrics, PocketMeasurement, Result};
use serde::{Deserialize, Serialize};

/// Direction of a monotonic transfer function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increasing,
    Decreasing,
}

/// Maps a raw metric value onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferFunction {
    /// Linear ramp from `worst` (0.0) to `best` (1.0), clamped. `best` may be
    /// below `worst` for metrics where smaller is better.
    Linear { worst: f64, best: f64 },

    /// Two-sided plateau: 1.0 between `low_best` and `high_best`, falling
    /// linearly to 0.0 at `low_worst` and `high_worst`.
    Window {
        low_worst: f64,
        low_best: f64,
        high_best: f64,
        high_worst: f64,
    },

    /// Logistic curve, 0.5 at `center`; `scale` sets the width.
    Sigmoid {
        center: f64,
        scale: f64,
        direction: Direction,
    },
}

impl TransferFunction {
    pub fn apply(&self, x: f64) -> f64 {
        let y = match *self {
            TransferFunction::Linear { worst, best } => (x - worst) / (best - worst),
            TransferFunction::Window {
                low_worst,
                low_best,
                high_best,
                high_worst,
            } => {
                if x < low_best {
                    (x - low_worst) / (low_best - low_worst)
                } else if x <= high_best {
                    1.0
                } else {
                    (high_worst - x) / (high_worst - high_best)
                }
            }
            TransferFunction::Sigmoid {
                center,
                scale,
                direction,
            } => {
                let z = (x - center) / scale;
                match direction {
                    Direction::Increasing => 1.0 / (1.0 + (-z).exp()),
                    Direction::Decreasing => 1.0 / (1.0 + z.exp()),
                }
            }
        };
        y.clamp(0.0, 1.0)
    }

    pub fn validate(&self, metric: Metric) -> Result<()> {
        let bad = |reason: &str| {
            Err(CrypticError::config(format!(
                "normalization for '{}': {}",
                metric, reason
            )))
        };
        match *self {
            TransferFunction::Linear { worst, best } => {
                if !worst.is_finite() || !best.is_finite() {
                    return bad("linear bounds must be finite");
                }
                if worst == best {
                    return bad("linear worst and best bounds must differ");
                }
            }
            TransferFunction::Window {
                low_worst,
                low_best,
                high_best,
                high_worst,
            } => {
                let bounds = [low_worst, low_best, high_best, high_worst];
                if bounds.iter().any(|b| !b.is_finite()) {
                    return bad("window bounds must be finite");
                }
                if !(low_worst < low_best && low_best <= high_best && high_best < high_worst) {
                    return bad("window bounds must satisfy low_worst < low_best <= high_best < high_worst");
                }
            }
            TransferFunction::Sigmoid { center, scale, .. } => {
                if !center.is_finite() {
                    return bad("sigmoid center must be finite");
                }
                if !(scale.is_finite() && scale > 0.0) {
                    return bad("sigmoid scale must be a positive number");
                }
            }
        }
        Ok(())
    }
}

/// Transfer function per metric, plus the policy for a missing potential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub volume: TransferFunction,
    pub depth: TransferFunction,
    pub sasa: TransferFunction,
    pub potential: TransferFunction,
    pub basic_residues: TransferFunction,
    /// Normalized value used when a pocket has no electrostatic potential.
    /// `None` makes a missing potential an invalid metric.
    pub missing_potential: Option<f64>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            volume: TransferFunction::Window {
                low_worst: 0.0,
                low_best: 300.0,
                high_best: 800.0,
                high_worst: 1800.0,
            },
            depth: TransferFunction::Sigmoid {
                center: 15.0,
                scale: 2.0,
                direction: Direction::Increasing,
            },
            sasa: TransferFunction::Sigmoid {
                center: 5.0,
                scale: 1.5,
                direction: Direction::Decreasing,
            },
            potential: TransferFunction::Sigmoid {
                center: 5.0,
                scale: 1.25,
                direction: Direction::Increasing,
            },
            basic_residues: TransferFunction::Sigmoid {
                center: 4.0,
                scale: 1.0,
                direction: Direction::Increasing,
            },
            missing_potential: None,
        }
    }
}

impl NormalizationConfig {
    pub fn transfer(&self, metric: Metric) -> &TransferFunction {
        match metric {
            Metric::Volume => &self.volume,
            Metric::Depth => &self.depth,
            Metric::Sasa => &self.sasa,
            Metric::Potential => &self.potential,
            Metric::BasicResidues => &self.basic_residues,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for metric in Metric::ALL {
            self.transfer(metric).validate(metric)?;
        }
        if let Some(fallback) = self.missing_potential {
            if !(0.0..=1.0).contains(&fallback) {
                return Err(CrypticError::config(format!(
                    "missing_potential must lie in [0, 1], got {}",
                    fallback
                )));
            }
        }
        Ok(())
    }
}

/// Applies a validated `NormalizationConfig` to pocket measurements.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizationConfig,
}

impl Normalizer {
    pub fn new(config: NormalizationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Metrics this normalizer produces.
    pub fn metrics(&self) -> &'static [Metric] {
        &Metric::ALL
    }

    pub fn normalize(&self, pocket: &PocketMeasurement) -> Result<NormalizedMetrics> {
        let mut normalized = NormalizedMetrics::new();
        for metric in Metric::ALL {
            let value = match checked_raw(pocket, metric)? {
                Some(raw) => self.config.transfer(metric).apply(raw),
                None => match self.config.missing_potential {
                    Some(fallback) => fallback,
                    None => {
                        return Err(CrypticError::invalid_metric(
                            pocket.id,
                            metric,
                            "value is missing",
                        ))
                    }
                },
            };
            normalized.insert(metric, value);
        }
        Ok(normalized)
    }
}

/// Normalize one measurement under `config`.
pub fn normalize(
    pocket: &PocketMeasurement,
    config: &NormalizationConfig,
) -> Result<NormalizedMetrics> {
    Normalizer::new(config.clone())?.normalize(pocket)
}

/// Raw value with domain checks; `Ok(None)` only for an absent potential.
fn checked_raw(pocket: &PocketMeasurement, metric: Metric) -> Result<Option<f64>> {
    let Some(value) = pocket.raw(metric) else {
        return Ok(None);
    };
    if !value.is_finite() {
        return Err(CrypticError::invalid_metric(
            pocket.id,
            metric,
            format!("value {} is not finite", value),
        ));
    }
    let in_domain = match metric {
        Metric::Volume => value > 0.0,
        Metric::Depth | Metric::Sasa => value >= 0.0,
        Metric::Potential | Metric::BasicResidues => true,
    };
    if !in_domain {
        return Err(CrypticError::invalid_metric(
            pocket.id,
            metric,
            format!("value {} is outside the physical domain", value),
        ));
    }
    Ok(Some(value))
}
