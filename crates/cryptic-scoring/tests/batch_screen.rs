use cryptic_core::{
    CrypticError, InMemorySource, MeasuredStructure, MeasurementSource, PocketMeasurement,
    StructureMetadata,
};
use cryptic_core::AnalysisResult;
use cryptic_scoring::{
    by_max_score, BatchCoordinator, CheckpointStore, JsonFileCheckpointStore, MemoryCheckpointStore, Outcome,
    ScreenConfig, StopSignal, StructureStage,
};

fn buried_pocket(id: u32) -> PocketMeasurement {
    PocketMeasurement {
        id,
        volume: 642.0,
        depth: 18.3,
        sasa: 2.1,
        potential: Some(7.5),
        basic_residues: 6,
        center: [10.0, 12.0, 8.5],
        lining_residues: vec![376, 519, 522, 651, 672],
    }
}

fn surface_pocket(id: u32) -> PocketMeasurement {
    PocketMeasurement {
        id,
        volume: 642.0,
        depth: 6.0,
        sasa: 45.0,
        potential: Some(1.0),
        basic_residues: 1,
        center: [0.0; 3],
        lining_residues: vec![20, 21, 22],
    }
}

fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("S{:02}", i)).collect()
}

/// Ten structures; the fifth fails in the detector.
fn proteome(ids: &[String]) -> InMemorySource {
    let mut source = InMemorySource::new();
    for (i, id) in ids.iter().enumerate() {
        if i == 4 {
            source.insert_failure(id.clone(), "fpocket exited with status 1");
        } else {
            let pockets = if i % 2 == 0 {
                vec![surface_pocket(1), buried_pocket(2)]
            } else {
                vec![surface_pocket(1)]
            };
            source.insert(MeasuredStructure::new(StructureMetadata::new(id.clone()), pockets));
        }
    }
    source
}

fn config(jobs: usize, interval: usize) -> ScreenConfig {
    ScreenConfig {
        jobs,
        checkpoint_interval: interval,
        ..Default::default()
    }
}

#[test]
fn failed_structure_does_not_abort_batch() {
    let ids = ids(10);
    let source = proteome(&ids);
    let coordinator = BatchCoordinator::new(&config(3, 4)).unwrap();
    let mut store = MemoryCheckpointStore::new();

    let report = coordinator.screen(&ids, &source, &mut store).unwrap();

    assert_eq!(report.done().count(), 9);
    assert_eq!(report.failed().count(), 1);
    let failed = report.failed().next().unwrap();
    assert_eq!(failed.structure_id, "S05");
    match &failed.outcome {
        Outcome::Failed(failure) => {
            assert_eq!(failure.stage, StructureStage::Pending);
            assert!(failure.cause.contains("fpocket"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.not_reached.is_empty());
    assert!(!report.cancelled);

    // outcomes follow the requested order regardless of worker scheduling
    let order: Vec<&str> = report.outcomes.iter().map(|o| o.structure_id.as_str()).collect();
    let expected: Vec<&str> = ids.iter().map(String::as_str).collect();
    assert_eq!(order, expected);

    // 10 pending structures in chunks of 4
    assert_eq!(store.flush_count(), 3 + 1);
    assert_eq!(store.list_completed().len(), 9);
}

#[test]
fn results_rank_by_best_pocket() {
    let ids = ids(10);
    let source = proteome(&ids);
    let coordinator = BatchCoordinator::new(&config(2, 500)).unwrap();
    let mut store = MemoryCheckpointStore::new();
    let report = coordinator.screen(&ids, &source, &mut store).unwrap();

    let mut ranked: Vec<&AnalysisResult> = report.results().collect();
    ranked.sort_by(|a, b| by_max_score(a, b));
    let order: Vec<&str> = ranked
        .iter()
        .map(|r| r.structure.accession.as_str())
        .collect();
    assert_eq!(
        order,
        vec!["S01", "S03", "S07", "S09", "S02", "S04", "S06", "S08", "S10"]
    );
}

#[test]
fn summary_counts_candidates() {
    let ids = ids(10);
    let source = proteome(&ids);
    let coordinator = BatchCoordinator::new(&config(2, 500)).unwrap();
    let mut store = MemoryCheckpointStore::new();
    let summary = coordinator.screen(&ids, &source, &mut store).unwrap().summary();

    // buried pockets in S01, S03, S07, S09 (S05 failed)
    assert_eq!(summary.requested, 10);
    assert_eq!(summary.done, 9);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.skipped, 0);
    let high = summary.top_by_class[0].1;
    assert_eq!(high, 4);
}

#[test]
fn resume_skips_done_structures() {
    let ids = ids(10);
    let source = proteome(&ids);
    let coordinator = BatchCoordinator::new(&config(1, 3)).unwrap();
    let mut store = MemoryCheckpointStore::new();

    // first run is interrupted after the first chunk
    let stop = coordinator.stop_signal();
    let interrupting = StopAfter {
        inner: &source,
        remaining: std::sync::atomic::AtomicUsize::new(3),
        stop: stop.clone(),
    };
    let first = coordinator.screen(&ids, &interrupting, &mut store).unwrap();
    assert!(first.cancelled);
    assert_eq!(first.outcomes.len(), 3);
    assert_eq!(first.not_reached.len(), 7);
    assert_eq!(source.invocations(), 3);

    stop.reset();
    let second = coordinator.screen(&ids, &source, &mut store).unwrap();
    assert!(!second.cancelled);
    assert_eq!(second.outcomes.len(), 10);
    assert_eq!(second.outcomes.iter().filter(|o| o.from_checkpoint).count(), 3);
    // only the 7 structures not finished before the stop were measured again
    assert_eq!(source.invocations(), 3 + 7);

    // a third run reuses every done structure and retries the failed one
    let third = coordinator.screen(&ids, &source, &mut store).unwrap();
    assert_eq!(third.outcomes.iter().filter(|o| o.from_checkpoint).count(), 9);
    assert_eq!(source.invocations(), 3 + 7 + 1);
}

#[test]
fn mismatched_structure_set_is_inconsistent() {
    let ids = ids(10);
    let source = proteome(&ids);
    let coordinator = BatchCoordinator::new(&config(1, 500)).unwrap();
    let mut store = MemoryCheckpointStore::new();
    coordinator.screen(&ids, &source, &mut store).unwrap();
    let calls = source.invocations();

    let fewer = ids[..8].to_vec();
    let err = coordinator.screen(&fewer, &source, &mut store).unwrap_err();
    assert!(matches!(err, CrypticError::CheckpointInconsistency(_)));

    let mut more = ids.clone();
    more.push("S11".to_string());
    let err = coordinator.screen(&more, &source, &mut store).unwrap_err();
    assert!(matches!(err, CrypticError::CheckpointInconsistency(_)));

    // nothing was measured by the rejected runs
    assert_eq!(source.invocations(), calls);
}

#[test]
fn superset_accepted_when_extension_allowed() {
    let ids = ids(10);
    let mut source = proteome(&ids);
    source.insert(MeasuredStructure::new(StructureMetadata::new("S11"), vec![buried_pocket(1)]));

    let mut store = MemoryCheckpointStore::new();
    BatchCoordinator::new(&config(1, 500))
        .unwrap()
        .screen(&ids, &source, &mut store)
        .unwrap();
    let calls = source.invocations();

    let mut extending = config(1, 500);
    extending.allow_checkpoint_extension = true;
    let mut more = ids.clone();
    more.push("S11".to_string());
    let report = BatchCoordinator::new(&extending)
        .unwrap()
        .screen(&more, &source, &mut store)
        .unwrap();

    assert_eq!(report.outcomes.len(), 11);
    // S05 retried, S11 new
    assert_eq!(source.invocations(), calls + 2);
    assert_eq!(store.manifest().unwrap().len(), 11);
    assert_eq!(store.manifest().unwrap().last().map(String::as_str), Some("S11"));
}

#[test]
fn json_checkpoint_resume_across_processes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screen.ckpt.json");
    let ids = ids(10);
    let source = proteome(&ids);
    let coordinator = BatchCoordinator::new(&config(2, 4)).unwrap();

    {
        let mut store = JsonFileCheckpointStore::open(&path).unwrap();
        coordinator.screen(&ids, &source, &mut store).unwrap();
    }
    assert!(path.exists());

    let mut reopened = JsonFileCheckpointStore::open(&path).unwrap();
    assert_eq!(reopened.list_completed().len(), 9);
    let report = coordinator.screen(&ids, &source, &mut reopened).unwrap();
    assert_eq!(report.done().filter(|o| o.from_checkpoint).count(), 9);
    // only the failed structure is measured again
    assert_eq!(source.invocations(), 10 + 1);

    let restored = report.results().find(|r| r.structure.accession == "S01").unwrap();
    assert_eq!(restored.top_candidate().unwrap().id(), 2);
    assert!(restored.verdict.is_candidate());
}

/// Forwards to a source and raises the stop signal after `remaining` calls.
struct StopAfter<'a> {
    inner: &'a InMemorySource,
    remaining: std::sync::atomic::AtomicUsize,
    stop: StopSignal,
}

impl MeasurementSource for StopAfter<'_> {
    fn measure(&self, structure_id: &str) -> cryptic_core::Result<MeasuredStructure> {
        use std::sync::atomic::Ordering;
        let left = self.remaining.fetch_sub(1, Ordering::SeqCst);
        if left <= 1 {
            self.stop.stop();
        }
        self.inner.measure(structure_id)
    }
}
