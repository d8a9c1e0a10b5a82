//! Output collaborators: where rendered files go and who hears about progress.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::state::JobState;

/// Failure to persist or remove an output file.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output rejected: {0}")]
    Rejected(String),
}

/// Receives rendered payloads under their final file names.
///
/// Saving a name that already exists replaces the earlier payload.
#[async_trait]
pub trait FileSink: Send {
    /// Stores `bytes` as `file_name`. Returns `true` when the file did not
    /// exist before this call, `false` when an existing file was replaced.
    async fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<bool, SinkError>;

    /// Removes a previously saved file. Removing a missing file is not an error.
    async fn remove(&mut self, file_name: &str) -> Result<(), SinkError>;
}

// ── DirectorySink ─────────────────────────────────────────────────────────

/// Writes each file into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf, SinkError> {
        let file = Path::new(file_name);
        if file.components().count() != 1 || file.file_name().is_none() {
            return Err(SinkError::Rejected(format!("{file_name:?} is not a plain file name")));
        }
        Ok(self.dir.join(file))
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<bool, SinkError> {
        let path = self.path_for(file_name)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::Write { path: self.dir.clone(), source })?;
        let existed = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| SinkError::Write { path: path.clone(), source })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| SinkError::Write { path: path.clone(), source })?;
        log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(!existed)
    }

    async fn remove(&mut self, file_name: &str) -> Result<(), SinkError> {
        let path = self.path_for(file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SinkError::Remove { path, source }),
        }
    }
}

// ── MemorySink ────────────────────────────────────────────────────────────

/// Keeps outputs in memory, ordered by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, Vec<u8>>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<&[u8]> {
        self.files.get(file_name).map(Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total `save` calls, overwrites included.
    #[inline]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

#[async_trait]
impl FileSink for MemorySink {
    async fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<bool, SinkError> {
        let previous = self.files.insert(file_name.to_string(), bytes.to_vec());
        self.writes += 1;
        Ok(previous.is_none())
    }

    async fn remove(&mut self, file_name: &str) -> Result<(), SinkError> {
        self.files.remove(file_name);
        Ok(())
    }
}

// ── ProgressSink ──────────────────────────────────────────────────────────

/// Observer for job progress. Purely informational: nothing flows back into
/// the runner.
pub trait ProgressSink: Send {
    /// The runner moved to a new item; its text is about to be rendered.
    fn on_item_started(&mut self, state: &JobState) {
        let _ = state;
    }

    /// The current item was rendered and saved as `file_name`.
    fn on_item_saved(&mut self, state: &JobState, file_name: &str) {
        let _ = (state, file_name);
    }

    /// Terminal snapshot (`Completed` or `Failed`), sent before the runner
    /// resets to `Idle`.
    fn on_finished(&mut self, state: &JobState) {
        let _ = state;
    }
}

impl ProgressSink for () {}

/// Reports progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_item_started(&mut self, state: &JobState) {
        log::debug!(
            "rendering {}/{}: {:?}",
            state.current_index() + 1,
            state.total(),
            state.current_name()
        );
    }

    fn on_item_saved(&mut self, state: &JobState, file_name: &str) {
        log::info!("[{:>3}%] saved {file_name}", state.percent());
    }

    fn on_finished(&mut self, state: &JobState) {
        log::info!(
            "batch finished: {:?} after {} of {}",
            state.status(),
            state.current_index(),
            state.total()
        );
    }
}
