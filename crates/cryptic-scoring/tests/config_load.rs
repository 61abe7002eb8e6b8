use cryptic_scoring::{CrypticError, ScreenConfig};
use std::path::PathBuf;

#[test]
fn loads_default_config_file() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
    let config = ScreenConfig::from_file(&path).expect("load default config");

    assert_eq!(config, ScreenConfig::default());
    assert!((config.score_threshold - 0.70).abs() < f64::EPSILON);
    assert!((config.confidence_threshold - 70.0).abs() < f64::EPSILON);
    assert_eq!(config.checkpoint_interval, 500);
    assert!((config.weights.sasa - 0.30).abs() < f64::EPSILON);
    assert!(config.criteria.is_none());
    assert!(config.normalization.missing_potential.is_none());
}

#[test]
fn missing_file_is_io_error() {
    let err = ScreenConfig::from_file("/nonexistent/cryptic.toml").unwrap_err();
    assert!(matches!(err, CrypticError::Io(_)));
}

#[test]
fn custom_transfer_function_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("linear.toml");
    std::fs::write(
        &path,
        r#"
score_threshold = 0.6

[normalization.volume]
kind = "linear"
worst = 100.0
best = 600.0

[criteria]
min_basic_residues = 3
"#,
    )
    .unwrap();

    let config = ScreenConfig::from_file(&path).unwrap();
    assert_eq!(config.score_threshold, 0.6);
    let criteria = config.criteria.unwrap();
    assert_eq!(criteria.min_basic_residues, 3);
    assert_eq!(criteria.max_sasa, 10.0);
}

#[test]
fn degenerate_transfer_function_rejected() {
    let err = ScreenConfig::from_toml_str(
        r#"
[normalization.depth]
kind = "sigmoid"
center = 15.0
scale = 0.0
direction = "increasing"
"#,
    )
    .unwrap_err();
    assert!(err.is_fatal());
}
