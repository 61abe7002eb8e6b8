//! Candidate export
//!
//! Passing pockets of a whole screen are aggregated into one ranked table
//! (score descending, then accession, then pocket id) and written as CSV.

use cryptic_core::{AnalysisResult, CrypticError, Result, ScoredPocket};
use serde::Serialize;
use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;

/// One row of the candidate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    pub rank: usize,
    pub accession: String,
    pub protein_name: Option<String>,
    pub pocket_id: u32,
    pub score: f64,
    pub classification: String,
    pub meets_criteria: Option<bool>,
    pub mean_confidence: Option<f64>,
    pub low_confidence: bool,
    pub volume: f64,
    pub depth: f64,
    pub sasa: f64,
    pub potential: Option<f64>,
    pub basic_residues: u32,
}

impl CandidateRow {
    fn from_pocket(result: &AnalysisResult, pocket: &ScoredPocket) -> Self {
        let m = &pocket.measurement;
        Self {
            rank: 0,
            accession: result.structure.accession.clone(),
            protein_name: result.structure.protein_name.clone(),
            pocket_id: m.id,
            score: pocket.score,
            classification: pocket.classification.as_str().to_string(),
            meets_criteria: pocket.meets_criteria,
            mean_confidence: pocket.mean_confidence,
            low_confidence: pocket.low_confidence,
            volume: m.volume,
            depth: m.depth,
            sasa: m.sasa,
            potential: m.potential,
            basic_residues: m.basic_residues,
        }
    }
}

/// Up to `per_structure` passing pockets from every result, ranked.
pub fn collect_candidates<'a>(
    results: impl IntoIterator<Item = &'a AnalysisResult>,
    per_structure: usize,
) -> Vec<CandidateRow> {
    let mut rows: Vec<CandidateRow> = results
        .into_iter()
        .flat_map(|result| {
            result
                .passing()
                .take(per_structure)
                .map(move |pocket| CandidateRow::from_pocket(result, pocket))
        })
        .collect();

    rows.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.accession.cmp(&b.accession))
            .then_with(|| a.pocket_id.cmp(&b.pocket_id))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

pub fn write_candidates_csv<W: Write>(writer: W, rows: &[CandidateRow]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|e| CrypticError::csv(e.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_candidates_csv_file(path: impl AsRef<Path>, rows: &[CandidateRow]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_candidates_csv(file, rows)
}

/// Orders results by their best score, highest first.
pub fn by_max_score(a: &AnalysisResult, b: &AnalysisResult) -> Ordering {
    let score = |r: &AnalysisResult| r.max_score().unwrap_or(f64::NEG_INFINITY);
    score(b)
        .total_cmp(&score(a))
        .then_with(|| a.structure.accession.cmp(&b.structure.accession))
}
