//! Export pipeline controller.
//!
//! Drives one render at a time through the fixed stage sequence. Stage state
//! is recomputed from the highest progress value seen so far, so late or
//! out-of-order callbacks never move a stage backwards. Each run owns a
//! cancellation token; [`ExportController::reset`] cancels it before clearing
//! local state, and callbacks from a cancelled run are discarded.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::layout::{plan_crop, TargetDimension};
use super::render::{ProgressSink, RenderBackend, RenderJob, RenderedVideo};
use super::stage::{initial_stages, mark_error, overall_progress, stages_at, Stage, StageStatus};
use crate::error::{MediaError, Result};
use crate::overlay::{BrandingLayer, SubtitleTrack};

/// Inputs for one export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source: PathBuf,
    pub subtitles: SubtitleTrack,
    pub branding: BrandingLayer,
    /// `None` keeps the source's native dimensions.
    pub target: Option<TargetDimension>,
}

impl ExportRequest {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            subtitles: SubtitleTrack::new(),
            branding: BrandingLayer::new(),
            target: None,
        }
    }

    #[must_use]
    pub fn with_subtitles(mut self, subtitles: SubtitleTrack) -> Self {
        self.subtitles = subtitles;
        self
    }

    #[must_use]
    pub fn with_branding(mut self, branding: BrandingLayer) -> Self {
        self.branding = branding;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetDimension) -> Self {
        self.target = Some(target);
        self
    }
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSnapshot {
    pub stages: Vec<Stage>,
    /// Weighted overall progress, 0–100
    pub overall: f64,
}

impl ExportSnapshot {
    /// The stage currently `processing` or in `error`, if any.
    pub fn current(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| matches!(s.status, StageStatus::Processing | StageStatus::Error))
    }

    pub fn is_failed(&self) -> bool {
        self.stages.iter().any(|s| s.status == StageStatus::Error)
    }
}

/// Callback receiving every stage update.
pub type SnapshotObserver = Arc<dyn Fn(&ExportSnapshot) + Send + Sync>;

struct RunState {
    generation: u64,
    high_water: f64,
    failed: bool,
    stages: Vec<Stage>,
    cancel: CancellationToken,
}

impl RunState {
    fn snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            overall: overall_progress(&self.stages),
            stages: self.stages.clone(),
        }
    }
}

struct Shared {
    state: Mutex<RunState>,
    observer: Option<SnapshotObserver>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, snapshot: Option<ExportSnapshot>) {
        if let (Some(observer), Some(snapshot)) = (self.observer.as_ref(), snapshot) {
            observer(&snapshot);
        }
    }

    /// Apply a progress report from run `generation`.
    fn advance(&self, generation: u64, progress: f64, message: &str) {
        let snapshot = {
            let mut state = self.lock();
            if state.generation != generation || state.failed || progress.is_nan() {
                return;
            }
            if progress < state.high_water {
                debug!(progress, high_water = state.high_water, "ignoring stale progress");
                return;
            }
            state.high_water = progress;
            state.stages = stages_at(progress);
            if let Some(stage) = state
                .stages
                .iter_mut()
                .find(|s| s.status == StageStatus::Processing)
            {
                stage.message = Some(message.to_string());
            }
            Some(state.snapshot())
        };
        self.notify(snapshot);
    }

    /// Mark the processing stage of run `generation` as failed.
    fn fail(&self, generation: u64, message: &str) {
        let snapshot = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.failed = true;
            mark_error(&mut state.stages, message);
            Some(state.snapshot())
        };
        self.notify(snapshot);
    }
}

/// Export Pipeline Controller.
pub struct ExportController {
    backend: Arc<dyn RenderBackend>,
    shared: Arc<Shared>,
}

impl ExportController {
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self::build(backend, None)
    }

    /// Register a stage update observer.
    #[must_use]
    pub fn with_observer(self, observer: SnapshotObserver) -> Self {
        Self::build(self.backend, Some(observer))
    }

    fn build(backend: Arc<dyn RenderBackend>, observer: Option<SnapshotObserver>) -> Self {
        Self {
            backend,
            shared: Arc::new(Shared {
                state: Mutex::new(RunState {
                    generation: 0,
                    high_water: 0.0,
                    failed: false,
                    stages: initial_stages(),
                    cancel: CancellationToken::new(),
                }),
                observer,
            }),
        }
    }

    /// Current stage state.
    pub fn snapshot(&self) -> ExportSnapshot {
        self.shared.lock().snapshot()
    }

    /// Cancel any in-flight run and return every stage to `pending`.
    pub fn reset(&self) {
        let snapshot = {
            let mut state = self.shared.lock();
            state.cancel.cancel();
            Self::clear(&mut state);
            state.snapshot()
        };
        info!("export reset");
        self.shared.notify(Some(snapshot));
    }

    fn clear(state: &mut RunState) {
        state.generation += 1;
        state.high_water = 0.0;
        state.failed = false;
        state.stages = initial_stages();
        state.cancel = CancellationToken::new();
    }

    /// Run a full export.
    ///
    /// On failure the processing stage is marked `error` with the backend
    /// message verbatim and no later stage starts. A run superseded by
    /// [`reset`](Self::reset) fails with [`MediaError::Cancelled`].
    pub async fn export(&self, request: &ExportRequest) -> Result<RenderedVideo> {
        let (generation, cancel) = {
            let mut state = self.shared.lock();
            state.cancel.cancel();
            Self::clear(&mut state);
            (state.generation, state.cancel.clone())
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(MediaError::Cancelled),
            r = self.run(request, generation) => r,
        };

        match result {
            Ok(video) => {
                self.shared.advance(generation, 100.0, "Export complete");
                info!(bytes = video.len(), format = video.format.extension(), "export complete");
                Ok(video)
            }
            Err(e) => {
                warn!(error = %e, "export failed");
                let message = match e {
                    MediaError::RenderBackend(ref msg) => msg.clone(),
                    ref other => other.to_string(),
                };
                self.shared.fail(generation, &message);
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ExportRequest, generation: u64) -> Result<RenderedVideo> {
        self.shared.advance(generation, 0.0, "Probing source");
        let source_info = self.backend.probe(&request.source).await?;

        let crop = match request.target {
            Some(ref target) => {
                let plan = plan_crop(source_info.width, source_info.height, target)?;
                info!(
                    source = %format!("{}x{}", source_info.width, source_info.height),
                    target = %format!("{}x{}", target.width, target.height),
                    axis = ?plan.axis,
                    "crop planned"
                );
                Some(plan)
            }
            None => None,
        };

        let job = RenderJob {
            source: request.source.clone(),
            source_info,
            subtitles: request.subtitles.clone(),
            branding: request.branding.clone(),
            crop,
        };

        let shared = Arc::clone(&self.shared);
        let sink: ProgressSink = Arc::new(move |progress, message| {
            shared.advance(generation, progress, message);
        });

        self.backend.render(&job, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::layout::CropAxis;
    use crate::export::render::{OutputFormat, VideoInfo};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::Path;

    /// Reports a fixed progress script, then succeeds or fails.
    struct ScriptedBackend {
        info: VideoInfo,
        script: Vec<f64>,
        fail_with: Option<String>,
        jobs: Mutex<Vec<RenderJob>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<f64>) -> Self {
            Self {
                info: VideoInfo {
                    width: 1920,
                    height: 1080,
                    duration_secs: 30.0,
                },
                script,
                fail_with: None,
                jobs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RenderBackend for ScriptedBackend {
        async fn probe(&self, _source: &Path) -> Result<VideoInfo> {
            Ok(self.info)
        }

        async fn render(&self, job: &RenderJob, progress: ProgressSink) -> Result<RenderedVideo> {
            self.jobs.lock().unwrap().push(job.clone());
            for &p in &self.script {
                progress(p, "working");
            }
            if let Some(ref msg) = self.fail_with {
                return Err(MediaError::RenderBackend(msg.clone()));
            }
            Ok(RenderedVideo {
                bytes: Bytes::from_static(b"video"),
                format: OutputFormat::Mp4,
            })
        }
    }

    fn statuses(snapshot: &ExportSnapshot) -> Vec<StageStatus> {
        snapshot.stages.iter().map(|s| s.status).collect()
    }

    #[tokio::test]
    async fn scripted_run_completes_every_stage_in_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![0.0, 15.0, 25.0, 45.0, 95.0, 100.0]));
        let history = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&history);
        let controller = ExportController::new(backend)
            .with_observer(Arc::new(move |s: &ExportSnapshot| seen.lock().unwrap().push(s.clone())));

        let video = controller.export(&ExportRequest::new("in.mp4")).await.unwrap();
        assert_eq!(video.bytes, Bytes::from_static(b"video"));

        let snapshot = controller.snapshot();
        assert!(statuses(&snapshot).iter().all(|s| *s == StageStatus::Completed));
        assert!((snapshot.overall - 100.0).abs() < 1e-9);

        // Once a stage completes, no earlier stage is ever processing again.
        for snap in history.lock().unwrap().iter() {
            if let Some(done) = snap.stages.iter().rposition(|s| s.status == StageStatus::Completed) {
                assert!(snap.stages[..done].iter().all(|s| s.status == StageStatus::Completed));
            }
        }
    }

    #[tokio::test]
    async fn out_of_order_progress_never_regresses() {
        let backend = Arc::new(ScriptedBackend::new(vec![45.0, 25.0, 10.0]));
        let history = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&history);
        let controller = ExportController::new(backend)
            .with_observer(Arc::new(move |s: &ExportSnapshot| seen.lock().unwrap().push(s.overall)));

        controller.export(&ExportRequest::new("in.mp4")).await.unwrap();

        let overall = history.lock().unwrap().clone();
        assert!(overall.windows(2).all(|w| w[0] <= w[1]), "{overall:?}");
    }

    #[tokio::test]
    async fn backend_error_marks_processing_stage() {
        let mut backend = ScriptedBackend::new(vec![0.0, 25.0, 45.0]);
        backend.fail_with = Some("encoder exploded".to_string());
        let controller = ExportController::new(Arc::new(backend));

        let err = controller.export(&ExportRequest::new("in.mp4")).await.unwrap_err();
        assert!(matches!(err, MediaError::RenderBackend(ref m) if m == "encoder exploded"));

        let snapshot = controller.snapshot();
        use StageStatus::{Completed as C, Error as E, Pending as P};
        assert_eq!(statuses(&snapshot), vec![C, C, C, E, P]);
        assert_eq!(snapshot.stages[3].message.as_deref(), Some("encoder exploded"));
        assert!(snapshot.is_failed());
        assert_eq!(snapshot.current().map(|s| s.id.as_str()), Some("render"));
    }

    #[tokio::test]
    async fn target_dimension_selects_crop_axis() {
        let backend = Arc::new(ScriptedBackend::new(vec![100.0]));
        let controller = ExportController::new(backend.clone());

        controller
            .export(&ExportRequest::new("in.mp4").with_target(TargetDimension::vertical()))
            .await
            .unwrap();
        controller.export(&ExportRequest::new("in.mp4")).await.unwrap();

        let jobs = backend.jobs.lock().unwrap();
        assert_eq!(jobs[0].crop.map(|c| c.axis), Some(CropAxis::Horizontal));
        assert_eq!(jobs[0].output_size(), (1080, 1920));
        assert!(jobs[1].crop.is_none());
        assert_eq!(jobs[1].output_size(), (1920, 1080));
    }

    #[tokio::test]
    async fn reset_clears_stages() {
        let controller = ExportController::new(Arc::new(ScriptedBackend::new(vec![0.0, 50.0])));
        controller.export(&ExportRequest::new("in.mp4")).await.unwrap();
        controller.reset();

        let snapshot = controller.snapshot();
        assert!(statuses(&snapshot).iter().all(|s| *s == StageStatus::Pending));
        assert_eq!(snapshot.overall, 0.0);
    }

    struct HangingBackend {
        started: tokio::sync::Notify,
    }

    #[async_trait]
    impl RenderBackend for HangingBackend {
        async fn probe(&self, _source: &Path) -> Result<VideoInfo> {
            Ok(VideoInfo {
                width: 640,
                height: 360,
                duration_secs: 1.0,
            })
        }

        async fn render(&self, _job: &RenderJob, progress: ProgressSink) -> Result<RenderedVideo> {
            progress(50.0, "rendering forever");
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn reset_cancels_in_flight_run() {
        let backend = Arc::new(HangingBackend {
            started: tokio::sync::Notify::new(),
        });
        let controller = Arc::new(ExportController::new(backend.clone()));

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.export(&ExportRequest::new("in.mp4")).await }
        });

        backend.started.notified().await;
        assert_eq!(controller.snapshot().stages[3].status, StageStatus::Processing);

        controller.reset();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));

        // The cancelled run's failure does not leak into the reset state.
        let snapshot = controller.snapshot();
        assert!(statuses(&snapshot).iter().all(|s| *s == StageStatus::Pending));
    }
}
