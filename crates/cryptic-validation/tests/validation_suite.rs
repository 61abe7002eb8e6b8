//! End-to-end control validation on synthetic measurements.

use cryptic_core::{InMemorySource, MeasuredStructure, PocketMeasurement, StructureMetadata};
use cryptic_scoring::ScreenConfig;
use cryptic_validation::{
    ControlCase, ControlSet, ResidueSelection, StructuralCheck, SuccessCriteria, ValidationSuite,
    ADAR2_IP6_RESIDUES,
};
use std::path::Path;

fn pocket(id: u32, depth: f64, sasa: f64, potential: f64, basic: u32, lining: &[i32]) -> PocketMeasurement {
    PocketMeasurement {
        id,
        volume: 642.0,
        depth,
        sasa,
        potential: Some(potential),
        basic_residues: basic,
        center: [0.0; 3],
        lining_residues: lining.to_vec(),
    }
}

fn buried(accession: &str) -> MeasuredStructure {
    MeasuredStructure::new(
        StructureMetadata::new(accession),
        vec![
            pocket(1, 18.3, 2.1, 7.5, 6, &ADAR2_IP6_RESIDUES),
            pocket(2, 6.0, 45.0, 1.0, 1, &[100, 101]),
        ],
    )
}

fn exposed(accession: &str) -> MeasuredStructure {
    MeasuredStructure::new(
        StructureMetadata::new(accession),
        vec![pocket(1, 6.0, 45.0, 1.0, 1, &[20, 21, 22])],
    )
}

fn adar2() -> ControlCase {
    ControlCase::positive("ADAR2", "AF-P78563-F1")
        .with_expected_residues(ADAR2_IP6_RESIDUES)
        .with_success_criteria(SuccessCriteria::default())
}

fn write_ca_trace(path: &Path, coords: &[[f64; 3]]) {
    let mut text = String::new();
    for (i, c) in coords.iter().enumerate() {
        text.push_str(&format!(
            "ATOM  {:>5} {:<4} {:>3} A{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}           C\n",
            i + 1,
            "CA",
            "LYS",
            i + 1,
            c[0],
            c[1],
            c[2],
            1.0,
            90.0
        ));
    }
    text.push_str("END\n");
    std::fs::write(path, text).unwrap();
}

#[test]
fn test_controls_separate() {
    let source = InMemorySource::new()
        .with(buried("AF-P78563-F1"))
        .with(exposed("1MAI"));
    let suite = ValidationSuite::new(&ScreenConfig::default()).unwrap();
    let report = suite.validate(&[adar2()], &[ControlCase::negative("PLCd1_PH", "1MAI")], &source);

    assert!(report.all_passed());
    let positive = report.positives().next().unwrap();
    assert!((positive.top_score.unwrap() - 0.87).abs() < 0.01);
    assert_eq!(positive.overlap, Some(1.0));
    assert_eq!(positive.criteria.len(), 4);

    let negative = report.negatives().next().unwrap();
    assert!(negative.top_score.unwrap() < 0.70);

    assert!(report.separation.is_separated());
    let mean = report.mean_separation.unwrap();
    assert!(mean.clear_separation);
}

#[test]
fn test_negative_with_passing_pocket_fails() {
    let source = InMemorySource::new().with(buried("1BTK"));
    let suite = ValidationSuite::new(&ScreenConfig::default()).unwrap();
    let report = suite.validate(&[], &[ControlCase::negative("Btk_PH", "1BTK")], &source);

    assert!(!report.all_passed());
    assert_eq!(report.failed().count(), 1);
    // no passing positive, so no worst-case separation
    assert_eq!(report.separation.separation, None);
    assert!(report.separation.max_negative.unwrap() > 0.8);
}

#[test]
fn test_measurement_failure_only_fails_that_control() {
    let mut source = InMemorySource::new().with(buried("AF-P78563-F1"));
    source.insert_failure("5HDT", "fpocket produced no output");
    let suite = ValidationSuite::new(&ScreenConfig::default()).unwrap();
    let report = suite.validate(&[adar2(), ControlCase::positive("Pds5B", "5HDT")], &[], &source);

    assert!(report.records[0].passed);
    let pds5b = &report.records[1];
    assert!(!pds5b.passed);
    assert!(pds5b.result.is_none());
    assert!(pds5b.error.as_ref().unwrap().contains("fpocket"));
}

#[test]
fn test_structural_check_in_report() {
    let dir = tempfile::tempdir().unwrap();
    let trace = [
        [0.0, 0.0, 0.0],
        [3.8, 0.0, 0.0],
        [5.0, 3.6, 0.0],
        [5.5, 5.0, 3.4],
    ];
    let shifted: Vec<[f64; 3]> = trace.iter().map(|p| [p[0] + 10.0, p[1] - 4.0, p[2] + 1.0]).collect();
    write_ca_trace(&dir.path().join("model.pdb"), &trace);
    write_ca_trace(&dir.path().join("reference.pdb"), &shifted);
    write_ca_trace(&dir.path().join("truncated.pdb"), &trace[..3]);

    let check = |reference: &str| StructuralCheck {
        model: dir.path().join("model.pdb"),
        reference: dir.path().join(reference),
        selection: ResidueSelection::all().ca_only(),
        max_rmsd: 2.0,
    };

    let source = InMemorySource::new()
        .with(buried("AF-P78563-F1"))
        .with(buried("AF-Q9NS39-F1"));
    let aligned = adar2().with_structural_check(check("reference.pdb"));
    let mismatched = ControlCase::positive("ADAR3", "AF-Q9NS39-F1")
        .with_expected_residues(ADAR2_IP6_RESIDUES)
        .with_structural_check(check("truncated.pdb"));

    let suite = ValidationSuite::new(&ScreenConfig::default()).unwrap();
    let report = suite.validate(&[aligned, mismatched], &[], &source);

    let ok = &report.records[0];
    assert!(ok.passed);
    assert!(ok.rmsd.unwrap() < 1e-6);

    let bad = &report.records[1];
    assert!(!bad.passed);
    assert!(bad.rmsd.is_none());
    assert!(bad.error.as_ref().unwrap().contains("atoms"));
    // scoring still ran for the record
    assert!(bad.top_score.unwrap() > 0.8);
}

#[test]
fn test_builtin_catalog_against_missing_source() {
    let set = ControlSet::builtin();
    let suite = ValidationSuite::new(&ScreenConfig::exploratory()).unwrap();
    let report = suite.validate(&set.positives, &set.negatives, &InMemorySource::new());

    assert_eq!(report.records.len(), 5);
    assert_eq!(report.failed().count(), 5);
    assert_eq!(report.score_threshold, 0.60);
}
