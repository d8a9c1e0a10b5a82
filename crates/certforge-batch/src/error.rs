use certforge_engine::render::RenderError;
use thiserror::Error;

use crate::sink::SinkError;
use crate::state::JobState;

/// Why a batch did not complete.
///
/// Precondition variants are returned before the job starts. The per-item
/// variants carry the terminal `Failed` snapshot, which names the item that
/// broke the batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no names to render")]
    EmptyNameList,
    #[error("scene has no template image")]
    MissingTemplate,
    #[error(
        "rendering item {index} ({name:?}) failed",
        index = .state.current_index(),
        name = .state.current_name()
    )]
    Capture {
        state: JobState,
        #[source]
        source: RenderError,
    },
    #[error(
        "saving {file_name} for item {index} ({name:?}) failed",
        index = .state.current_index(),
        name = .state.current_name()
    )]
    Persist {
        state: JobState,
        file_name: String,
        #[source]
        source: SinkError,
    },
}

impl BatchError {
    /// Terminal job snapshot, for failures that happened mid-run.
    pub fn failed_state(&self) -> Option<&JobState> {
        match self {
            BatchError::Capture { state, .. } | BatchError::Persist { state, .. } => Some(state),
            BatchError::EmptyNameList | BatchError::MissingTemplate => None,
        }
    }

    /// True when the job never started.
    pub fn is_precondition(&self) -> bool {
        self.failed_state().is_none()
    }
}
