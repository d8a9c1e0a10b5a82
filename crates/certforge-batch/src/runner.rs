//! The batch job state machine.
//!
//! `Idle → Running → {Completed, Failed}`, one item at a time:
//!
//! 1. record index + name in the job state
//! 2. write the name into the working scene
//! 3. wait for the settle barrier
//! 4. render, then persist under the file name the renderer suggests
//!    (`certificate-<sanitized>.png`)
//!
//! Item `i + 1` is not touched until item `i` is saved. The first render or
//! save failure ends the batch.

use std::time::Duration;

use certforge_engine::render::{RenderError, RenderResult, SceneRenderer};
use certforge_engine::scene::Scene;

use crate::error::BatchError;
use crate::names::NameList;
use crate::sink::{FileSink, ProgressSink};
use crate::state::JobState;

/// Settle barrier used unless configured otherwise.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Shortest settle barrier the runner accepts.
pub const MIN_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    settle_delay: Duration,
    cleanup_on_failure: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            cleanup_on_failure: false,
        }
    }
}

impl RunnerConfig {
    /// Sets the settle barrier, raised to [`MIN_SETTLE_DELAY`] if shorter.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay.max(MIN_SETTLE_DELAY);
        self
    }

    /// Remove the files a batch created if it later fails.
    ///
    /// Only files the sink reports as newly created are removed. A file that
    /// existed before the run and was overwritten stays, holding the new
    /// render.
    pub fn with_cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = cleanup;
        self
    }

    /// Pause between updating the scene text and capturing it. Never below
    /// [`MIN_SETTLE_DELAY`].
    #[inline]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay.max(MIN_SETTLE_DELAY)
    }

    #[inline]
    pub fn cleanup_on_failure(&self) -> bool {
        self.cleanup_on_failure
    }
}

/// Outcome of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Terminal `Completed` snapshot.
    pub final_state: JobState,
    /// Distinct file names written, in first-write order.
    pub files: Vec<String>,
    /// Number of renders persisted, overwrites included.
    pub rendered: usize,
}

/// Drives a [`SceneRenderer`] over a [`NameList`].
pub struct BatchJobRunner<R, F, P> {
    renderer: R,
    sink: F,
    progress: P,
    config: RunnerConfig,
    state: JobState,
}

impl<R, F, P> BatchJobRunner<R, F, P>
where
    R: SceneRenderer,
    F: FileSink,
    P: ProgressSink,
{
    pub fn new(renderer: R, sink: F, progress: P) -> Self {
        Self {
            renderer,
            sink,
            progress,
            config: RunnerConfig::default(),
            state: JobState::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Current job state. `Idle` between runs.
    #[inline]
    pub fn state(&self) -> &JobState {
        &self.state
    }

    #[inline]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[inline]
    pub fn sink(&self) -> &F {
        &self.sink
    }

    #[inline]
    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Renders and saves one certificate per name, in order.
    ///
    /// `scene` is snapshotted on entry: only the text changes between items.
    /// On return the runner is `Idle` again; the terminal state travels in
    /// the report or the error.
    pub async fn run_all(
        &mut self,
        names: &NameList,
        scene: &Scene,
    ) -> Result<JobReport, BatchError> {
        if names.is_empty() {
            return Err(BatchError::EmptyNameList);
        }
        if !scene.has_template() {
            return Err(BatchError::MissingTemplate);
        }

        let mut working = scene.clone();
        let mut files: Vec<String> = Vec::new();
        let mut created: Vec<String> = Vec::new();

        self.state.begin(names.len());
        log::info!("batch started: {} certificates", names.len());

        for (index, name) in names.iter().enumerate() {
            self.state.advance(index, name);
            self.progress.on_item_started(&self.state);

            working.set_text(name);
            self.settle().await;

            let rendered = self.renderer.render(&working).await;
            let RenderResult { bytes, file_name, .. } = match rendered {
                Ok(result) => result,
                Err(source) => {
                    log::error!("render failed for item {index} ({name:?}): {source}");
                    let state = self.abort(&created).await;
                    return Err(BatchError::Capture { state, source });
                }
            };

            match self.sink.save(&file_name, &bytes).await {
                Ok(true) => created.push(file_name.clone()),
                Ok(false) => {}
                Err(source) => {
                    log::error!("saving {file_name} failed: {source}");
                    let state = self.abort(&created).await;
                    return Err(BatchError::Persist { state, file_name, source });
                }
            }

            if files.contains(&file_name) {
                log::warn!("{file_name} overwritten by item {index} ({name:?})");
            } else {
                files.push(file_name.clone());
            }
            self.progress.on_item_saved(&self.state, &file_name);
        }

        self.state.complete();
        let final_state = self.state.clone();
        self.progress.on_finished(&final_state);
        self.state.reset();

        log::info!("batch completed: {} files", files.len());
        Ok(JobReport { final_state, files, rendered: names.len() })
    }

    /// Renders and saves a single certificate through the batch path,
    /// settle barrier included.
    pub async fn render_one(
        &mut self,
        name: &str,
        scene: &Scene,
    ) -> Result<JobReport, BatchError> {
        self.run_all(&NameList::new([name]), scene).await
    }

    /// Renders the scene as-is for display. No settle barrier, nothing
    /// persisted, job state untouched.
    pub async fn preview(&self, scene: &Scene) -> Result<RenderResult, RenderError> {
        self.renderer.render(scene).await
    }

    async fn settle(&self) {
        tokio::time::sleep(self.config.settle_delay()).await;
    }

    /// Marks the job failed, notifies observers, optionally removes the files
    /// this batch created and resets to `Idle`. Returns the `Failed` snapshot.
    async fn abort(&mut self, created: &[String]) -> JobState {
        self.state.fail();
        let failed = self.state.clone();
        self.progress.on_finished(&failed);

        if self.config.cleanup_on_failure() {
            for file_name in created {
                if let Err(e) = self.sink.remove(file_name).await {
                    log::warn!("could not remove partial output {file_name}: {e}");
                }
            }
            log::info!("removed {} partial outputs", created.len());
        }

        self.state.reset();
        failed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use certforge_engine::naming::certificate_file_name;
    use certforge_engine::scene::Template;
    use image::RgbaImage;
    use tokio::time::Instant;

    use super::*;
    use crate::sink::{MemorySink, SinkError};
    use crate::state::JobStatus;

    // ── fakes ─────────────────────────────────────────────────────────────

    /// Returns the scene text as the payload; fails on the listed call numbers.
    #[derive(Default)]
    struct ScriptedRenderer {
        fail_on: Vec<usize>,
        seen: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedRenderer {
        fn failing_on(call: usize) -> Self {
            Self { fail_on: vec![call], ..Self::default() }
        }

        fn seen_texts(&self) -> Vec<String> {
            self.seen.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl SceneRenderer for ScriptedRenderer {
        async fn render(&self, scene: &Scene) -> Result<RenderResult, RenderError> {
            let call = {
                let mut seen = self.seen.lock().unwrap();
                seen.push((scene.text().to_string(), Instant::now()));
                seen.len() - 1
            };
            if self.fail_on.contains(&call) {
                return Err(RenderError::Capture(format!("scripted failure on call {call}")));
            }
            Ok(RenderResult {
                bytes: scene.text().as_bytes().to_vec(),
                file_name: certificate_file_name(scene.text()),
                width: 1,
                height: 1,
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<JobState>,
        saved: Vec<(JobState, String)>,
        finished: Vec<JobState>,
    }

    impl ProgressSink for Recorder {
        fn on_item_started(&mut self, state: &JobState) {
            self.started.push(state.clone());
        }
        fn on_item_saved(&mut self, state: &JobState, file_name: &str) {
            self.saved.push((state.clone(), file_name.to_string()));
        }
        fn on_finished(&mut self, state: &JobState) {
            self.finished.push(state.clone());
        }
    }

    /// Accepts the first `ok` saves, then rejects.
    struct FlakySink {
        inner: MemorySink,
        ok: usize,
    }

    #[async_trait]
    impl FileSink for FlakySink {
        async fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<bool, SinkError> {
            if self.inner.writes() >= self.ok {
                return Err(SinkError::Rejected("disk full".to_string()));
            }
            self.inner.save(file_name, bytes).await
        }

        async fn remove(&mut self, file_name: &str) -> Result<(), SinkError> {
            self.inner.remove(file_name).await
        }
    }

    /// Always suggests the same file name, whatever the text.
    struct FixedNameRenderer(&'static str);

    #[async_trait]
    impl SceneRenderer for FixedNameRenderer {
        async fn render(&self, scene: &Scene) -> Result<RenderResult, RenderError> {
            Ok(RenderResult {
                bytes: scene.text().as_bytes().to_vec(),
                file_name: self.0.to_string(),
                width: 1,
                height: 1,
            })
        }
    }

    fn scene() -> Scene {
        let mut scene = Scene::with_template(Template::from_rgba(RgbaImage::new(4, 4)).unwrap());
        scene.set_text("live preview text");
        scene
    }

    fn runner(
        renderer: ScriptedRenderer,
    ) -> BatchJobRunner<ScriptedRenderer, MemorySink, Recorder> {
        BatchJobRunner::new(renderer, MemorySink::new(), Recorder::default())
    }

    // ── preconditions ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn empty_name_list_is_rejected_and_stays_idle() {
        let mut runner = runner(ScriptedRenderer::default());
        let err = runner.run_all(&NameList::default(), &scene()).await.unwrap_err();

        assert!(matches!(err, BatchError::EmptyNameList));
        assert!(err.is_precondition());
        assert_eq!(runner.state().status(), JobStatus::Idle);
        assert!(runner.renderer().seen_texts().is_empty());
        assert!(runner.progress().started.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_template_is_rejected_without_touching_state() {
        let mut runner = runner(ScriptedRenderer::default());
        let before = runner.state().clone();

        let err = runner.run_all(&NameList::new(["Alice"]), &Scene::new()).await.unwrap_err();

        assert!(matches!(err, BatchError::MissingTemplate));
        assert_eq!(runner.state(), &before);
        assert!(runner.renderer().seen_texts().is_empty());
        assert!(runner.progress().finished.is_empty());
    }

    // ── happy path ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn renders_each_name_in_order() {
        let mut runner = runner(ScriptedRenderer::default());
        let names = NameList::new(["Alice Smith", "Bob!"]);

        let report = runner.run_all(&names, &scene()).await.unwrap();

        assert_eq!(runner.renderer().seen_texts(), ["Alice Smith", "Bob!"]);
        assert_eq!(report.files, ["certificate-alice_smith.png", "certificate-bob_.png"]);
        assert_eq!(report.rendered, 2);
        assert_eq!(report.final_state.status(), JobStatus::Completed);
        assert_eq!(report.final_state.current_index(), 2);

        let sink = runner.sink();
        assert_eq!(sink.get("certificate-alice_smith.png"), Some(&b"Alice Smith"[..]));
        assert_eq!(sink.get("certificate-bob_.png"), Some(&b"Bob!"[..]));
        assert_eq!(runner.state(), &JobState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn unique_names_give_one_output_each() {
        let names: NameList = (0..25).map(|i| format!("Student {i}")).collect();
        let mut runner = runner(ScriptedRenderer::default());

        let report = runner.run_all(&names, &scene()).await.unwrap();

        assert_eq!(runner.sink().len(), names.len());
        assert_eq!(report.files.len(), names.len());
        for name in names.iter() {
            assert!(runner.sink().get(&certificate_file_name(name)).is_some(), "{name}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_monotonic_and_reaches_total_only_on_completion() {
        let mut runner = runner(ScriptedRenderer::default());
        runner.run_all(&NameList::new(["a", "b", "c", "d"]), &scene()).await.unwrap();

        let recorder = runner.progress();
        let indices: Vec<usize> = recorder.started.iter().map(JobState::current_index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);

        for state in recorder.started.iter().chain(recorder.saved.iter().map(|(s, _)| s)) {
            assert_eq!(state.status(), JobStatus::Running);
            assert!(state.current_index() < state.total());
            assert_eq!(state.total(), 4);
        }

        let fractions: Vec<f32> = recorder.saved.iter().map(|(s, _)| s.progress()).collect();
        assert_eq!(fractions, [0.25, 0.5, 0.75, 1.0]);

        assert_eq!(recorder.finished.len(), 1);
        assert_eq!(recorder.finished[0].status(), JobStatus::Completed);
        assert_eq!(recorder.finished[0].current_index(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_precedes_every_capture() {
        let mut runner = runner(ScriptedRenderer::default());
        let start = Instant::now();

        runner.run_all(&NameList::new(["a", "b", "c"]), &scene()).await.unwrap();

        let seen = runner.renderer().seen.lock().unwrap();
        let mut previous = start;
        for (_, at) in seen.iter() {
            assert!(*at - previous >= DEFAULT_SETTLE_DELAY);
            previous = *at;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_settle_delay_still_waits_the_minimum() {
        let config = RunnerConfig {
            settle_delay: Duration::ZERO,
            ..RunnerConfig::default()
        };
        let mut runner = runner(ScriptedRenderer::default()).with_config(config);
        let start = Instant::now();

        runner.run_all(&NameList::new(["a", "b"]), &scene()).await.unwrap();

        let seen = runner.renderer().seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let mut previous = start;
        for (_, at) in seen.iter() {
            assert!(*at - previous >= MIN_SETTLE_DELAY);
            previous = *at;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn names_are_used_verbatim() {
        let mut runner = runner(ScriptedRenderer::default());

        let report = runner.run_all(&NameList::new([" Alice "]), &scene()).await.unwrap();

        assert_eq!(runner.renderer().seen_texts(), [" Alice "]);
        assert_eq!(report.files, ["certificate-_alice_.png"]);
        assert_eq!(runner.sink().get("certificate-_alice_.png"), Some(&b" Alice "[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn saves_under_the_renderer_file_name() {
        let mut runner =
            BatchJobRunner::new(FixedNameRenderer("custom.png"), MemorySink::new(), ());

        let report = runner.run_all(&NameList::new(["Alice"]), &scene()).await.unwrap();

        assert_eq!(report.files, ["custom.png"]);
        assert_eq!(runner.sink().get("custom.png"), Some(&b"Alice"[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn scene_is_snapshotted_not_mutated() {
        let live = scene();
        let mut runner = runner(ScriptedRenderer::default());
        runner.run_all(&NameList::new(["Alice"]), &live).await.unwrap();
        assert_eq!(live.text(), "live preview text");
    }

    // ── collisions ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn colliding_names_overwrite_last_writer_wins() {
        let mut runner = runner(ScriptedRenderer::default());
        let report = runner.run_all(&NameList::new(["A!", "A?"]), &scene()).await.unwrap();

        assert_eq!(report.final_state.status(), JobStatus::Completed);
        assert_eq!(report.files, ["certificate-a_.png"]);
        assert_eq!(report.rendered, 2);
        assert_eq!(runner.sink().len(), 1);
        assert_eq!(runner.sink().writes(), 2);
        assert_eq!(runner.sink().get("certificate-a_.png"), Some(&b"A?"[..]));
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn render_failure_stops_the_batch() {
        let mut runner = runner(ScriptedRenderer::failing_on(1));
        let names = NameList::new(["Alice", "Bob", "Carol"]);

        let err = runner.run_all(&names, &scene()).await.unwrap_err();

        let BatchError::Capture { state, .. } = &err else {
            panic!("expected capture error, got {err:?}");
        };
        assert_eq!(state.status(), JobStatus::Failed);
        assert_eq!(state.current_index(), 1);
        assert_eq!(state.current_name(), "Bob");

        assert_eq!(runner.renderer().seen_texts(), ["Alice", "Bob"]);
        assert_eq!(runner.sink().len(), 1);
        assert!(runner.sink().get("certificate-alice.png").is_some());

        assert_eq!(runner.progress().finished, [state.clone()]);
        assert_eq!(runner.state(), &JobState::default());
        assert!(err.to_string().contains("Bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_partial_output() {
        let mut runner = runner(ScriptedRenderer::failing_on(2))
            .with_config(RunnerConfig::default().with_cleanup_on_failure(true));

        let err = runner.run_all(&NameList::new(["a", "b", "c"]), &scene()).await.unwrap_err();

        assert_eq!(err.failed_state().map(JobState::current_index), Some(2));
        assert!(runner.sink().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_keeps_files_that_existed_before_the_run() {
        let mut sink = MemorySink::new();
        sink.save("certificate-a.png", b"earlier run").await.unwrap();
        let mut runner = BatchJobRunner::new(ScriptedRenderer::failing_on(2), sink, ())
            .with_config(RunnerConfig::default().with_cleanup_on_failure(true));

        let err = runner.run_all(&NameList::new(["a", "b", "c"]), &scene()).await.unwrap_err();

        assert!(matches!(err, BatchError::Capture { .. }));
        assert_eq!(runner.sink().get("certificate-a.png"), Some(&b"a"[..]));
        assert!(runner.sink().get("certificate-b.png").is_none());
        assert_eq!(runner.sink().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_a_repeated_name_created_by_the_batch() {
        let mut runner = runner(ScriptedRenderer::failing_on(2))
            .with_config(RunnerConfig::default().with_cleanup_on_failure(true));

        let err = runner.run_all(&NameList::new(["a", "a", "b"]), &scene()).await.unwrap_err();

        assert_eq!(err.failed_state().map(JobState::current_index), Some(2));
        assert!(runner.sink().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn save_failure_is_fail_fast() {
        let sink = FlakySink { inner: MemorySink::new(), ok: 1 };
        let mut runner = BatchJobRunner::new(ScriptedRenderer::default(), sink, ());

        let err = runner.run_all(&NameList::new(["a", "b", "c"]), &scene()).await.unwrap_err();

        let BatchError::Persist { state, file_name, .. } = &err else {
            panic!("expected persist error, got {err:?}");
        };
        assert_eq!(state.current_index(), 1);
        assert_eq!(file_name, "certificate-b.png");
        assert_eq!(runner.renderer().seen_texts(), ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn runner_is_reusable_after_failure() {
        let mut runner = runner(ScriptedRenderer::failing_on(0));
        assert!(runner.run_all(&NameList::new(["x"]), &scene()).await.is_err());

        let report = runner.run_all(&NameList::new(["y"]), &scene()).await.unwrap();
        assert_eq!(report.final_state.status(), JobStatus::Completed);
        assert_eq!(runner.progress().started.last().map(JobState::current_index), Some(0));
    }

    // ── single item + preview ─────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn render_one_uses_batch_path() {
        let mut runner = runner(ScriptedRenderer::default());
        let start = Instant::now();

        let report = runner.render_one("Dana", &scene()).await.unwrap();

        assert_eq!(report.files, ["certificate-dana.png"]);
        assert!(Instant::now() - start >= DEFAULT_SETTLE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn render_one_with_blank_name_is_empty_list() {
        let mut runner = runner(ScriptedRenderer::default());
        let result = runner.render_one("   ", &scene()).await;
        assert!(matches!(result, Err(BatchError::EmptyNameList)));
    }

    #[tokio::test(start_paused = true)]
    async fn preview_skips_delay_and_persistence() {
        let runner = runner(ScriptedRenderer::default());
        let start = Instant::now();

        let result = runner.preview(&scene()).await.unwrap();

        assert_eq!(result.bytes, b"live preview text");
        assert_eq!(Instant::now(), start);
        assert!(runner.sink().is_empty());
        assert_eq!(runner.state().status(), JobStatus::Idle);
    }

    // ── config ────────────────────────────────────────────────────────────

    #[test]
    fn settle_delay_has_a_floor() {
        let config = RunnerConfig::default().with_settle_delay(Duration::from_millis(10));
        assert_eq!(config.settle_delay(), MIN_SETTLE_DELAY);
        let config = RunnerConfig::default().with_settle_delay(Duration::from_secs(1));
        assert_eq!(config.settle_delay(), Duration::from_secs(1));
        let config = RunnerConfig {
            settle_delay: Duration::ZERO,
            ..RunnerConfig::default()
        };
        assert_eq!(config.settle_delay(), MIN_SETTLE_DELAY);
    }
}
