//! Validation of the scoring setup against control proteins
//!
//! Every control runs through the same analyzer as a proteome screen.
//! A positive control passes when a pocket clears the threshold, its top
//! pocket lines the known binding residues and any attached criteria and
//! structural check hold. A negative control passes when no pocket clears
//! the threshold. A control that cannot be measured, parsed or superposed
//! fails on its own without stopping the suite.

use chrono::{DateTime, Utc};
use cryptic_core::{AnalysisResult, MeasurementSource, Result};
use cryptic_scoring::{PocketAnalyzer, ScreenConfig};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::controls::{ControlCase, ControlKind, CriterionCheck, StructuralCheck};
use crate::metrics::{overlap_fraction, MeanSeparation, SeparationStats};
use crate::structure::{calculate_rmsd, StructureCoords};

/// Outcome for one control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub name: String,
    pub structure_id: String,
    pub kind: ControlKind,
    pub expected_score: Option<f64>,
    /// Absent when measurement failed
    pub result: Option<AnalysisResult>,
    pub top_score: Option<f64>,
    /// Fraction of expected residues lining the top pocket
    pub overlap: Option<f64>,
    pub criteria: Vec<CriterionCheck>,
    pub rmsd: Option<f64>,
    pub passed: bool,
    /// Why the control failed, when it did not get as far as a verdict
    pub error: Option<String>,
}

impl ValidationRecord {
    fn new(case: &ControlCase) -> Self {
        Self {
            name: case.name.clone(),
            structure_id: case.structure_id.clone(),
            kind: case.kind,
            expected_score: case.expected_score,
            result: None,
            top_score: None,
            overlap: None,
            criteria: Vec::new(),
            rmsd: None,
            passed: false,
            error: None,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.kind == ControlKind::Positive
    }
}

/// Records for every control plus population statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub records: Vec<ValidationRecord>,
    pub separation: SeparationStats,
    pub mean_separation: Option<MeanSeparation>,
    pub score_threshold: f64,
    pub generated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn positives(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.iter().filter(|r| r.is_positive())
    }

    pub fn negatives(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.iter().filter(|r| !r.is_positive())
    }

    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|r| r.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.iter().filter(|r| !r.passed)
    }
}

/// Runs controls through the scoring pipeline.
pub struct ValidationSuite {
    analyzer: PocketAnalyzer,
    min_overlap_fraction: f64,
}

impl ValidationSuite {
    pub fn new(config: &ScreenConfig) -> Result<Self> {
        Ok(Self {
            analyzer: PocketAnalyzer::new(config)?,
            min_overlap_fraction: config.min_overlap_fraction,
        })
    }

    pub fn validate(
        &self,
        positives: &[ControlCase],
        negatives: &[ControlCase],
        source: &dyn MeasurementSource,
    ) -> ValidationReport {
        info!(
            "Validating against {} positive and {} negative controls",
            positives.len(),
            negatives.len()
        );

        let records: Vec<ValidationRecord> = positives
            .iter()
            .chain(negatives)
            .map(|case| self.run_control(case, source))
            .collect();

        let passing_positive_tops: Vec<f64> = records
            .iter()
            .filter(|r| r.is_positive())
            .filter_map(|r| r.result.as_ref()?.top_candidate())
            .filter(|top| top.passed_threshold)
            .map(|top| top.score)
            .collect();
        let negative_pockets: Vec<f64> = records
            .iter()
            .filter(|r| !r.is_positive())
            .filter_map(|r| r.result.as_ref())
            .flat_map(|result| result.pockets.iter().map(|p| p.score))
            .collect();
        let separation = SeparationStats::compute(&passing_positive_tops, &negative_pockets);

        let tops = |positive: bool| -> Vec<f64> {
            records
                .iter()
                .filter(|r| r.is_positive() == positive)
                .filter_map(|r| r.top_score)
                .collect()
        };
        let mean_separation = MeanSeparation::compute(&tops(true), &tops(false));

        let report = ValidationReport {
            records,
            separation,
            mean_separation,
            score_threshold: self.analyzer.score_threshold(),
            generated_at: Utc::now(),
        };
        let passed = report.records.iter().filter(|r| r.passed).count();
        info!(
            "Validation finished: {}/{} controls passed, separation {}",
            passed,
            report.records.len(),
            report
                .separation
                .separation
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "n/a".to_string())
        );
        report
    }

    fn run_control(&self, case: &ControlCase, source: &dyn MeasurementSource) -> ValidationRecord {
        let mut record = ValidationRecord::new(case);

        let measured = match source.measure(&case.structure_id) {
            Ok(measured) => measured,
            Err(e) => {
                warn!("{}: {}", case.name, e);
                record.error = Some(e.to_string());
                return record;
            }
        };
        let result = self.analyzer.analyze(measured);
        record.top_score = result.max_score();

        let expectation_met = match case.kind {
            ControlKind::Positive => self.positive_expectation(case, &result, &mut record),
            ControlKind::Negative => result.passing().next().is_none(),
        };
        record.result = Some(result);

        let structure_ok = match &case.structural_check {
            Some(check) => match structural_rmsd(check) {
                Ok(rmsd) => {
                    record.rmsd = Some(rmsd);
                    rmsd <= check.max_rmsd
                }
                Err(e) => {
                    warn!("{}: structural check failed: {}", case.name, e);
                    record.error = Some(e.to_string());
                    false
                }
            },
            None => true,
        };

        record.passed = expectation_met && structure_ok;
        info!(
            "{} ({:?}): top score {} → {}",
            case.name,
            case.kind,
            record
                .top_score
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "none".to_string()),
            if record.passed { "PASSED" } else { "FAILED" }
        );
        record
    }

    fn positive_expectation(
        &self,
        case: &ControlCase,
        result: &AnalysisResult,
        record: &mut ValidationRecord,
    ) -> bool {
        let Some(top) = result.top_candidate() else {
            return false;
        };
        let any_passing = result.passing().next().is_some();

        record.overlap = overlap_fraction(&case.expected_residues, &top.measurement.lining_residues);
        let overlap_ok = record
            .overlap
            .map_or(true, |f| f >= self.min_overlap_fraction);

        if let Some(criteria) = &case.success_criteria {
            record.criteria = criteria.check(top);
        }
        let criteria_ok = record.criteria.iter().all(|c| c.passed);

        any_passing && overlap_ok && criteria_ok
    }
}

fn structural_rmsd(check: &StructuralCheck) -> Result<f64> {
    let model = StructureCoords::from_pdb_file(&check.model)?;
    let reference = StructureCoords::from_pdb_file(&check.reference)?;
    calculate_rmsd(&model, &reference, &check.selection)
}
