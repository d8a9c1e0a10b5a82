//! Batch certificate rendering.
//!
//! [`BatchJobRunner`] walks a [`NameList`] in order and, per name, updates a
//! snapshot of the scene, waits for the settle barrier, renders through a
//! [`SceneRenderer`](certforge_engine::render::SceneRenderer) and hands the
//! PNG to a [`FileSink`]. The first failure aborts the batch.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`names`] | `NameList`, `NameSource`, `DelimitedNameSource`, `WorkbookNameSource` |
//! | [`state`] | `JobState`, `JobStatus` |
//! | [`sink`] | `FileSink`, `DirectorySink`, `MemorySink`, `ProgressSink` |
//! | [`runner`] | `BatchJobRunner`, `RunnerConfig`, `JobReport` |
//! | [`error`] | `BatchError` |

pub mod error;
pub mod names;
pub mod runner;
pub mod sink;
pub mod state;

pub use error::BatchError;
pub use names::{
    DelimitedNameSource, NameList, NameSource, NameSourceError, WorkbookNameSource,
};
pub use runner::{BatchJobRunner, JobReport, RunnerConfig, DEFAULT_SETTLE_DELAY, MIN_SETTLE_DELAY};
pub use sink::{DirectorySink, FileSink, LogProgress, MemorySink, ProgressSink, SinkError};
pub use state::{JobState, JobStatus};
