//! Export controller driven end to end with in-memory and ffmpeg backends.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use castforge::export::ffmpeg::build_filter_graph;
use castforge::export::{
    ExportSnapshot, OutputFormat, ProgressSink, RenderJob, RenderedVideo, VideoInfo,
};
use castforge::{
    BrandingLayer, ExportController, ExportRequest, FfmpegConfig, FfmpegRenderer, MediaError,
    RenderBackend, Result, StageId, StageStatus, SubtitleTrack, TargetDimension,
};

/// Records jobs; renders named `slow.mp4` block until released.
struct GatedBackend {
    started: Notify,
    release: Notify,
    jobs: Mutex<Vec<RenderJob>>,
}

impl GatedBackend {
    fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
            jobs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RenderBackend for GatedBackend {
    async fn probe(&self, _source: &Path) -> Result<VideoInfo> {
        Ok(VideoInfo {
            width: 1280,
            height: 720,
            duration_secs: 12.0,
        })
    }

    async fn render(&self, job: &RenderJob, progress: ProgressSink) -> Result<RenderedVideo> {
        self.jobs.lock().unwrap().push(job.clone());
        progress(20.0, "Writing subtitles");
        progress(30.0, "Compositing branding");
        progress(40.0, "Rendering");
        if job.source == Path::new("slow.mp4") {
            self.started.notify_one();
            self.release.notified().await;
        }
        progress(65.0, "Rendering");
        progress(90.0, "Finalizing");
        Ok(RenderedVideo {
            bytes: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
            format: OutputFormat::Mp4,
        })
    }
}

const TRACK_JSON: &str = r#"[
    {"start": 4.0, "end": 6.0, "text": "second"},
    {"start": 0.5, "end": 2.0, "text": "first", "speaker": "Host"}
]"#;

const BRANDING_JSON: &str = r#"[
    {"kind": "text", "content": {"text": "@castforge"}, "position": {"x": 80, "y": 90}},
    {"kind": "watermark", "content": {"text": "DRAFT"}, "opacity": 0.3, "visible": false},
    {"kind": "logo", "content": {"image": "/assets/logo.png"}, "size": {"width": 120, "height": 120}}
]"#;

#[tokio::test]
async fn overlays_from_json_reach_the_backend() {
    let subtitles: SubtitleTrack = serde_json::from_str(TRACK_JSON).unwrap();
    let branding: BrandingLayer = serde_json::from_str(BRANDING_JSON).unwrap();
    assert_eq!(subtitles.segments()[0].text, "first");

    let backend = Arc::new(GatedBackend::new());
    let controller = ExportController::new(backend.clone());
    let request = ExportRequest::new("clip.mp4")
        .with_subtitles(subtitles)
        .with_branding(branding)
        .with_target(TargetDimension::vertical());

    let video = controller.export(&request).await.unwrap();
    assert!(!video.is_empty());

    let jobs = backend.jobs.lock().unwrap();
    let job = &jobs[0];
    assert_eq!(job.subtitles.len(), 2);
    assert_eq!(job.branding.len(), 3);
    assert_eq!(job.branding.visible().count(), 2);
    assert_eq!(job.output_size(), (1080, 1920));

    let graph = build_filter_graph(job, Some(Path::new("/tmp/subs.ass")), None).unwrap();
    assert!(graph.filter.starts_with("[0:v]crop="));
    assert!(graph.filter.contains("drawtext=text='@castforge'"));
    assert!(!graph.filter.contains("DRAFT"));
    assert_eq!(graph.images, vec![std::path::PathBuf::from("/assets/logo.png")]);
    assert!(graph.filter.contains("ass='/tmp/subs.ass'"));
    // subtitles are burned in last
    assert!(graph.filter.ends_with(&format!("[{}]", graph.output_label)));
    assert!(graph.filter.rfind("ass=") > graph.filter.rfind("overlay="));
}

#[tokio::test]
async fn new_export_supersedes_running_one() {
    let backend = Arc::new(GatedBackend::new());
    let controller = Arc::new(ExportController::new(backend.clone()));

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.export(&ExportRequest::new("slow.mp4")).await })
    };
    backend.started.notified().await;

    let second = controller.export(&ExportRequest::new("fast.mp4")).await;
    assert!(second.is_ok());

    let first = first.await.unwrap();
    assert!(matches!(first, Err(MediaError::Cancelled)));

    // The superseded run leaves no trace in the current stage state.
    let snapshot = controller.snapshot();
    assert!(snapshot.stages.iter().all(|s| s.status == StageStatus::Completed));
    backend.release.notify_one();
}

#[tokio::test]
async fn stage_updates_walk_forward_through_all_stages() {
    let backend = Arc::new(GatedBackend::new());
    let order = Arc::new(Mutex::new(Vec::<StageId>::new()));
    let seen = Arc::clone(&order);
    let controller = ExportController::new(backend).with_observer(Arc::new(
        move |snapshot: &ExportSnapshot| {
            if let Some(stage) = snapshot.current() {
                let mut seen = seen.lock().unwrap();
                if seen.last() != Some(&stage.id) {
                    seen.push(stage.id);
                }
            }
        },
    ));

    controller.export(&ExportRequest::new("clip.mp4")).await.unwrap();

    assert_eq!(*order.lock().unwrap(), StageId::ALL.to_vec());
}

#[tokio::test]
async fn missing_ffprobe_fails_the_prepare_stage() {
    let config = FfmpegConfig {
        ffprobe_path: "/nonexistent/castforge-ffprobe".to_string(),
        ffmpeg_path: "/nonexistent/castforge-ffmpeg".to_string(),
        ..FfmpegConfig::default()
    };
    let renderer = FfmpegRenderer::new(config);
    assert!(!renderer.check_available().await);

    let controller = ExportController::new(Arc::new(renderer));
    let err = controller
        .export(&ExportRequest::new("clip.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::RenderBackend(_)));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.stages[0].status, StageStatus::Error);
    assert!(snapshot.stages[0]
        .message
        .as_deref()
        .is_some_and(|m| m.starts_with("failed to run ffprobe")));
    assert!(snapshot.stages[1..].iter().all(|s| s.status == StageStatus::Pending));
}
