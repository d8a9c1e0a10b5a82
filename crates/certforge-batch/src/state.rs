/// Lifecycle of a batch job.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Progress of the current batch.
///
/// Owned and mutated by the runner only; observers receive `&JobState`
/// snapshots.
///
/// Invariants:
/// - `current_index <= total`
/// - `current_index == total` only when `status == Completed`
/// - `current_index` never decreases while `Running`
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JobState {
    status: JobStatus,
    current_index: usize,
    total: usize,
    current_name: String,
}

impl JobState {
    #[inline]
    pub fn status(&self) -> JobStatus {
        self.status
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Fraction of the batch done, in `[0, 1]`.
    ///
    /// While running this counts the current item as done, matching the
    /// moment progress is reported (after the item is saved). A failed job
    /// counts only the items before the failing one.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let done = match self.status {
            JobStatus::Idle => 0,
            JobStatus::Running => self.current_index + 1,
            JobStatus::Completed => self.total,
            JobStatus::Failed => self.current_index,
        };
        (done as f32 / self.total as f32).min(1.0)
    }

    /// Progress as a rounded percentage.
    pub fn percent(&self) -> u32 {
        (self.progress() * 100.0).round() as u32
    }

    // ── transitions (runner only) ─────────────────────────────────────────

    pub(crate) fn begin(&mut self, total: usize) {
        debug_assert_eq!(self.status, JobStatus::Idle, "begin on a job that is not idle");
        self.status = JobStatus::Running;
        self.current_index = 0;
        self.total = total;
        self.current_name.clear();
    }

    pub(crate) fn advance(&mut self, index: usize, name: &str) {
        debug_assert!(self.is_running());
        debug_assert!(index >= self.current_index && index < self.total);
        self.current_index = index;
        self.current_name.clear();
        self.current_name.push_str(name);
    }

    pub(crate) fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.current_index = self.total;
    }

    pub(crate) fn fail(&mut self) {
        self.status = JobStatus::Failed;
    }

    pub(crate) fn reset(&mut self) {
        *self = JobState::default();
    }
}
