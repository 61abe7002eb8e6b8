//! Batch screening with checkpoint/resume

pub mod checkpoint;
pub mod coordinator;
pub mod source;

pub use checkpoint::{
    CheckpointEntry, CheckpointStore, JsonFileCheckpointStore, MemoryCheckpointStore,
};
pub use coordinator::{
    BatchCoordinator, Outcome, ScreenReport, ScreenSummary, StopSignal, StructureFailure,
    StructureOutcome, StructureStage,
};
pub use source::{read_measurements, JsonDirectorySource};
