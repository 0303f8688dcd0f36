//! Export stages and the progress → stage mapping.
//!
//! A single 0–100 progress value is mapped onto five fixed stages by
//! percentage range. [`stages_at`] is a pure function of that value, so the
//! stage list can be recomputed from scratch on every update.

use serde::Serialize;

/// Stage identity, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    Prepare,
    Subtitles,
    Branding,
    Render,
    Finalize,
}

impl StageId {
    pub const ALL: [StageId; 5] = [
        Self::Prepare,
        Self::Subtitles,
        Self::Branding,
        Self::Render,
        Self::Finalize,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Subtitles => "subtitles",
            Self::Branding => "branding",
            Self::Render => "render",
            Self::Finalize => "finalize",
        }
    }

    /// Human-readable name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prepare => "Preparing video",
            Self::Subtitles => "Adding subtitles",
            Self::Branding => "Applying branding",
            Self::Render => "Rendering",
            Self::Finalize => "Finalizing",
        }
    }

    /// Half-open `[start, end)` percentage range; `finalize` also owns 100.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Prepare => (0.0, 20.0),
            Self::Subtitles => (20.0, 30.0),
            Self::Branding => (30.0, 40.0),
            Self::Render => (40.0, 90.0),
            Self::Finalize => (90.0, 100.0),
        }
    }

    /// Share of overall progress, in percent.
    #[must_use]
    pub fn weight(&self) -> f64 {
        let (start, end) = self.range();
        end - start
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// One processing stage of an export run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub id: StageId,
    pub name: &'static str,
    pub status: StageStatus,
    /// Progress within this stage, 0–100
    pub progress: f64,
    pub message: Option<String>,
}

impl Stage {
    fn pending(id: StageId) -> Self {
        Self {
            id,
            name: id.name(),
            status: StageStatus::Pending,
            progress: 0.0,
            message: None,
        }
    }
}

/// All stages `pending` at zero progress.
#[must_use]
pub fn initial_stages() -> Vec<Stage> {
    StageId::ALL.iter().map(|&id| Stage::pending(id)).collect()
}

/// Stage statuses for an overall `progress` value.
///
/// Stages whose range lies entirely below `progress` are `completed`, the
/// stage whose range contains it is `processing`, later stages are `pending`.
/// At 100 every stage is `completed`. Out-of-range input is clamped.
#[must_use]
pub fn stages_at(progress: f64) -> Vec<Stage> {
    let p = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 100.0) };

    StageId::ALL
        .iter()
        .map(|&id| {
            let (start, end) = id.range();
            let mut stage = Stage::pending(id);
            if p >= end {
                stage.status = StageStatus::Completed;
                stage.progress = 100.0;
            } else if p >= start {
                stage.status = StageStatus::Processing;
                stage.progress = (p - start) / (end - start) * 100.0;
            }
            stage
        })
        .collect()
}

/// Weighted sum of per-stage progress, 0–100.
#[must_use]
pub fn overall_progress(stages: &[Stage]) -> f64 {
    stages
        .iter()
        .map(|s| s.id.weight() * s.progress / 100.0)
        .sum()
}

/// Mark the stage that is currently `processing` as `error`.
///
/// When nothing is processing (e.g. failure before the first progress
/// report) the first stage that is not `completed` takes the error.
pub fn mark_error(stages: &mut [Stage], message: &str) {
    let target = stages
        .iter()
        .position(|s| s.status == StageStatus::Processing)
        .or_else(|| stages.iter().position(|s| s.status != StageStatus::Completed));
    if let Some(idx) = target {
        stages[idx].status = StageStatus::Error;
        stages[idx].message = Some(message.to_string());
    }
}
