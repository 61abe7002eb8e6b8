//! Proteome-scale batch screening
//!
//! Structures are processed on a fixed-size rayon pool in chunks of
//! `checkpoint_interval`. Each structure moves
//! `Pending → Measured → Done`, or to `Failed` with the stage it had
//! reached; a failure never aborts the batch. After every chunk the
//! checkpoint store is flushed so that a resumed run skips finished work.

use chrono::{DateTime, Utc};
use cryptic_core::{AnalysisResult, CrypticError, MeasurementSource, Result, SiteClass};
use log::{info, warn};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::checkpoint::{CheckpointEntry, CheckpointStore};
use crate::analyzer::{count_by_class, PocketAnalyzer};
use crate::config::ScreenConfig;

/// Per-structure processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureStage {
    Pending,
    /// External collaborator produced pocket measurements
    Measured,
    Done,
    Failed,
}

/// Why a structure failed, and the last stage it reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureFailure {
    pub stage: StructureStage,
    pub cause: String,
}

/// Terminal state of one structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Done(AnalysisResult),
    Failed(StructureFailure),
}

impl Outcome {
    pub fn stage(&self) -> StructureStage {
        match self {
            Outcome::Done(_) => StructureStage::Done,
            Outcome::Failed(_) => StructureStage::Failed,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Outcome::Done(result) => Some(result),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StructureFailure> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }
}

/// Outcome of one requested structure in a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureOutcome {
    pub structure_id: String,
    pub outcome: Outcome,
    /// Taken from the checkpoint rather than recomputed
    pub from_checkpoint: bool,
}

/// Cooperative stop flag, checked between structures.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Full report of a screen: every requested structure is either in
/// `outcomes` or in `not_reached`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    /// In requested order
    pub outcomes: Vec<StructureOutcome>,
    /// Structures left pending by a stop request
    pub not_reached: Vec<String>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

/// Counts for a finished screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenSummary {
    pub requested: usize,
    pub done: usize,
    pub failed: usize,
    /// Done outcomes reused from the checkpoint
    pub skipped: usize,
    pub not_reached: usize,
    /// Structures with verdict `Candidate`
    pub candidates: usize,
    /// Classification of each done structure's top pocket
    pub top_by_class: [(SiteClass, usize); 4],
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl ScreenReport {
    pub fn done(&self) -> impl Iterator<Item = &StructureOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Done(_)))
    }

    pub fn failed(&self) -> impl Iterator<Item = &StructureOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed(_)))
    }

    pub fn results(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.outcomes.iter().filter_map(|o| o.outcome.result())
    }

    pub fn summary(&self) -> ScreenSummary {
        let results: Vec<&AnalysisResult> = self.results().collect();
        ScreenSummary {
            requested: self.outcomes.len() + self.not_reached.len(),
            done: results.len(),
            failed: self.failed().count(),
            skipped: self.outcomes.iter().filter(|o| o.from_checkpoint).count(),
            not_reached: self.not_reached.len(),
            candidates: results.iter().filter(|r| r.verdict.is_candidate()).count(),
            top_by_class: count_by_class(results.iter().filter_map(|r| r.top_candidate())),
            cancelled: self.cancelled,
            elapsed_secs: self.elapsed_secs,
        }
    }
}

/// Drives a proteome screen with checkpoint/resume.
pub struct BatchCoordinator {
    analyzer: PocketAnalyzer,
    jobs: usize,
    checkpoint_interval: usize,
    allow_extension: bool,
    stop: StopSignal,
}

impl BatchCoordinator {
    /// Validates the configuration before any structure is touched.
    pub fn new(config: &ScreenConfig) -> Result<Self> {
        Ok(Self {
            analyzer: PocketAnalyzer::new(config)?,
            jobs: config.jobs,
            checkpoint_interval: config.checkpoint_interval,
            allow_extension: config.allow_checkpoint_extension,
            stop: StopSignal::new(),
        })
    }

    /// Handle for requesting a cooperative stop from another thread.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn analyzer(&self) -> &PocketAnalyzer {
        &self.analyzer
    }

    /// Screen `structure_ids`, resuming from `store`.
    ///
    /// Only configuration and checkpoint errors are returned; per-structure
    /// failures are recorded in the report.
    pub fn screen(
        &self,
        structure_ids: &[String],
        source: &dyn MeasurementSource,
        store: &mut dyn CheckpointStore,
    ) -> Result<ScreenReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        check_unique(structure_ids)?;
        self.reconcile_manifest(structure_ids, store)?;

        let mut finished: HashMap<String, StructureOutcome> = HashMap::new();
        let mut pending: Vec<&String> = Vec::new();
        for id in structure_ids {
            match store.get(id) {
                Some(entry) if entry.is_done() => {
                    finished.insert(
                        id.clone(),
                        StructureOutcome {
                            structure_id: id.clone(),
                            outcome: entry.outcome,
                            from_checkpoint: true,
                        },
                    );
                }
                _ => pending.push(id),
            }
        }

        info!(
            "Screening {} structures ({} resumed from checkpoint, {} pending, {} jobs)",
            structure_ids.len(),
            finished.len(),
            pending.len(),
            self.jobs
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| CrypticError::config(format!("cannot start worker pool: {}", e)))?;

        let store = Mutex::new(store);
        let mut processed = 0usize;
        for chunk in pending.chunks(self.checkpoint_interval) {
            if self.stop.is_stopped() {
                break;
            }
            let outcomes: Vec<Result<Option<StructureOutcome>>> = pool.install(|| {
                chunk
                    .par_iter()
                    .map(|id| {
                        if self.stop.is_stopped() {
                            return Ok(None);
                        }
                        let outcome = self.process(id, source);
                        store
                            .lock()
                            .put(CheckpointEntry::new(id.as_str(), outcome.clone()))?;
                        Ok(Some(StructureOutcome {
                            structure_id: (*id).clone(),
                            outcome,
                            from_checkpoint: false,
                        }))
                    })
                    .collect()
            });

            let mut put_error = None;
            for outcome in outcomes {
                match outcome {
                    Ok(Some(outcome)) => {
                        processed += 1;
                        finished.insert(outcome.structure_id.clone(), outcome);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        put_error.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = put_error {
                warn!(
                    "Checkpoint write failed after {} structures: {}",
                    processed, e
                );
                if let Err(close_error) = store.into_inner().close() {
                    warn!("Checkpoint close failed: {}", close_error);
                }
                return Err(e);
            }
            store.lock().flush()?;
            info!(
                "Checkpoint: {}/{} pending structures processed",
                processed,
                pending.len()
            );
        }

        let store = store.into_inner();
        store.close()?;

        let mut outcomes = Vec::with_capacity(finished.len());
        let mut not_reached = Vec::new();
        for id in structure_ids {
            match finished.remove(id) {
                Some(outcome) => outcomes.push(outcome),
                None => not_reached.push(id.clone()),
            }
        }
        let cancelled = self.stop.is_stopped() && !not_reached.is_empty();

        let report = ScreenReport {
            outcomes,
            not_reached,
            cancelled,
            started_at,
            elapsed_secs: timer.elapsed().as_secs_f64(),
        };
        let summary = report.summary();
        info!(
            "Screen finished: {} done, {} failed, {} not reached, {} candidates in {:.1}s",
            summary.done, summary.failed, summary.not_reached, summary.candidates, summary.elapsed_secs
        );
        Ok(report)
    }

    /// Run one structure through measurement and scoring.
    ///
    /// A structure whose pockets were all rejected fails at `Measured`.
    fn process(&self, structure_id: &str, source: &dyn MeasurementSource) -> Outcome {
        let mut measured = match source.measure(structure_id) {
            Ok(measured) => measured,
            Err(e) => {
                warn!("{}: measurement failed: {}", structure_id, e);
                return Outcome::Failed(StructureFailure {
                    stage: StructureStage::Pending,
                    cause: e.to_string(),
                });
            }
        };
        if measured.metadata.accession.is_empty() {
            measured.metadata.accession = structure_id.to_string();
        }

        let result = self.analyzer.analyze(measured);
        if let (true, Some(first)) = (result.pockets.is_empty(), result.rejected.first()) {
            let cause = format!(
                "all {} pockets rejected, first: pocket {}: {}",
                result.rejected.len(),
                first.pocket_id,
                first.reason
            );
            warn!("{}: {}", structure_id, cause);
            return Outcome::Failed(StructureFailure {
                stage: StructureStage::Measured,
                cause,
            });
        }
        Outcome::Done(result)
    }

    fn reconcile_manifest(
        &self,
        structure_ids: &[String],
        store: &mut dyn CheckpointStore,
    ) -> Result<()> {
        let Some(manifest) = store.manifest() else {
            return store.record_manifest(structure_ids);
        };

        let recorded: BTreeSet<&String> = manifest.iter().collect();
        let requested: BTreeSet<&String> = structure_ids.iter().collect();
        if recorded == requested {
            return Ok(());
        }

        let missing = recorded.difference(&requested).count();
        let added: Vec<String> = requested
            .difference(&recorded)
            .map(|id| (*id).clone())
            .collect();
        if missing == 0 && self.allow_extension {
            info!(
                "Extending checkpoint manifest with {} new structures",
                added.len()
            );
            let mut extended = manifest.clone();
            extended.extend(added);
            return store.record_manifest(&extended);
        }

        Err(CrypticError::checkpoint(format!(
            "requested {} structures but the checkpoint records {} ({} missing from the request, {} not in the checkpoint)",
            requested.len(),
            recorded.len(),
            missing,
            added.len()
        )))
    }
}

fn check_unique(structure_ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(structure_ids.len());
    for id in structure_ids {
        if !seen.insert(id) {
            return Err(CrypticError::config(format!(
                "structure '{}' requested more than once",
                id
            )));
        }
    }
    Ok(())
}
