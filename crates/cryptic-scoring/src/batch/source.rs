//! Measurement files on disk.

use cryptic_core::{
    CrypticError, MeasuredStructure, MeasurementSource, Metric, PocketMeasurement,
    PocketRejection, Result, StructureMetadata,
};
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Pocket record as written by the detector, minus its id; any field may be absent.
#[derive(Deserialize)]
struct RawPocket {
    volume: Option<f64>,
    depth: Option<f64>,
    sasa: Option<f64>,
    potential: Option<f64>,
    basic_residues: Option<u32>,
    #[serde(default)]
    center: [f64; 3],
    #[serde(default)]
    lining_residues: Vec<i32>,
}

impl RawPocket {
    fn into_measurement(self, id: u32) -> Result<PocketMeasurement> {
        let missing = |metric| CrypticError::invalid_metric(id, metric, "value is missing");
        Ok(PocketMeasurement {
            id,
            volume: self.volume.ok_or_else(|| missing(Metric::Volume))?,
            depth: self.depth.ok_or_else(|| missing(Metric::Depth))?,
            sasa: self.sasa.ok_or_else(|| missing(Metric::Sasa))?,
            potential: self.potential,
            basic_residues: self
                .basic_residues
                .ok_or_else(|| missing(Metric::BasicResidues))?,
            center: self.center,
            lining_residues: self.lining_residues,
        })
    }
}

/// Split pocket records into readable measurements and rejections.
///
/// A record without an `id` takes its 1-based position in the list.
fn read_pockets(records: Vec<Value>) -> (Vec<PocketMeasurement>, Vec<PocketRejection>) {
    let mut pockets = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        let id = record
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .unwrap_or(i as u32 + 1);
        let parsed = serde_json::from_value::<RawPocket>(record)
            .map_err(CrypticError::from)
            .and_then(|raw| raw.into_measurement(id));
        match parsed {
            Ok(pocket) => pockets.push(pocket),
            Err(e) => rejected.push(PocketRejection {
                pocket_id: id,
                reason: e.to_string(),
            }),
        }
    }
    (pockets, rejected)
}

/// Read one structure's measurements from a JSON file.
///
/// The file holds either a structure record (`metadata`, `pockets`) or a
/// bare pocket list, in which case `structure_id` becomes the accession.
/// Unreadable pockets are returned in `rejected`; only an unreadable file
/// or structure record fails the structure.
pub fn read_measurements(path: &Path, structure_id: &str) -> Result<MeasuredStructure> {
    let fail = |reason: String| {
        CrypticError::structure(structure_id, format!("{}: {}", path.display(), reason))
    };

    let content = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let parsed: Value = serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?;

    let (metadata, records, mut rejected) = match parsed {
        Value::Array(records) => (StructureMetadata::new(structure_id), records, Vec::new()),
        Value::Object(mut record) => {
            let metadata = match record.remove("metadata") {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| fail(format!("invalid metadata: {}", e)))?,
                None => StructureMetadata::new(structure_id),
            };
            let records = match record.remove("pockets") {
                Some(Value::Array(records)) => records,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => return Err(fail("`pockets` must be a list".to_string())),
            };
            let rejected: Vec<PocketRejection> = match record.remove("rejected") {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| fail(format!("invalid rejected list: {}", e)))?,
                None => Vec::new(),
            };
            (metadata, records, rejected)
        }
        _ => {
            return Err(fail(
                "expected a structure record or a list of pockets".to_string(),
            ))
        }
    };

    let (pockets, unreadable) = read_pockets(records);
    for rejection in &unreadable {
        warn!(
            "{} pocket {} rejected: {}",
            structure_id, rejection.pocket_id, rejection.reason
        );
    }
    rejected.extend(unreadable);

    let mut structure = MeasuredStructure::new(metadata, pockets).with_rejected(rejected);
    if structure.metadata.accession.is_empty() {
        structure.metadata.accession = structure_id.to_string();
    }
    Ok(structure)
}

/// Directory of `<structure_id>.json` measurement files written by the
/// detection pipeline.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Structure ids of every `*.json` file in the directory, sorted.
    pub fn discover(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_of(&self, structure_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", structure_id))
    }
}

impl MeasurementSource for JsonDirectorySource {
    fn measure(&self, structure_id: &str) -> Result<MeasuredStructure> {
        read_measurements(&self.path_of(structure_id), structure_id)
    }
}
