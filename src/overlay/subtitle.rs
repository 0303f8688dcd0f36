//! Time-windowed subtitle segments.
//!
//! A [`SubtitleTrack`] always iterates in chronological order: every
//! insertion and update re-sorts the list by start time. Overlapping ranges
//! are allowed, but at most one segment is ever reported active.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MediaError, Result};

/// Words per segment when splitting a transcript with no sentence breaks.
pub const MAX_WORDS_PER_SEGMENT: usize = 12;

/// A single subtitle cue. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl SubtitleSegment {
    /// Create a segment with a fresh id. Fails unless `0 <= start < end`.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Result<Self> {
        let segment = Self {
            id: Uuid::new_v4(),
            start,
            end,
            text: text.into(),
            speaker: None,
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Set speaker label
    #[must_use]
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Whether `t` falls inside `[start, end]`.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub(crate) fn start_ms(&self) -> u64 {
        secs_to_ms(self.start)
    }

    pub(crate) fn end_ms(&self) -> u64 {
        secs_to_ms(self.end)
    }

    fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 {
            return Err(MediaError::Overlay(format!(
                "segment {} has invalid times {}..{}",
                self.id, self.start, self.end
            )));
        }
        if self.start >= self.end {
            return Err(MediaError::Overlay(format!(
                "segment {} starts at {} but ends at {}",
                self.id, self.start, self.end
            )));
        }
        Ok(())
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

/// Partial update for [`SubtitleTrack::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct SegmentPatch {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text: Option<String>,
    /// `Some(None)` clears the speaker.
    pub speaker: Option<Option<String>>,
}

/// Ordered subtitle list addressed by segment id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SubtitleSegment>", into = "Vec<SubtitleSegment>")]
pub struct SubtitleTrack {
    segments: Vec<SubtitleSegment>,
}

impl TryFrom<Vec<SubtitleSegment>> for SubtitleTrack {
    type Error = MediaError;

    fn try_from(segments: Vec<SubtitleSegment>) -> Result<Self> {
        Self::from_segments(segments)
    }
}

impl From<SubtitleTrack> for Vec<SubtitleSegment> {
    fn from(track: SubtitleTrack) -> Self {
        track.segments
    }
}

impl SubtitleTrack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and sort an arbitrary list of segments.
    pub fn from_segments(segments: Vec<SubtitleSegment>) -> Result<Self> {
        for segment in &segments {
            segment.validate()?;
        }
        let mut track = Self { segments };
        track.sort();
        Ok(track)
    }

    /// Split `transcript` into timed segments spread over `duration` seconds.
    ///
    /// Segments end at sentence terminators (`.`, `!`, `?`) or after
    /// [`MAX_WORDS_PER_SEGMENT`] words. Each segment's share of the duration
    /// is proportional to its word count.
    pub fn from_transcript(transcript: &str, duration: f64) -> Result<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MediaError::Overlay(format!("invalid duration {duration}")));
        }

        let words: Vec<&str> = transcript.split_whitespace().collect();
        let total = words.len();
        let mut segments = Vec::new();
        let mut first = 0;

        for (i, word) in words.iter().enumerate() {
            let sentence_end = word.ends_with(['.', '!', '?']);
            if sentence_end || i + 1 - first == MAX_WORDS_PER_SEGMENT || i + 1 == total {
                let start = duration * first as f64 / total as f64;
                let end = duration * (i + 1) as f64 / total as f64;
                segments.push(SubtitleSegment::new(start, end, words[first..=i].join(" "))?);
                first = i + 1;
            }
        }

        Ok(Self { segments })
    }

    /// Insert a segment and return its id.
    pub fn insert(&mut self, segment: SubtitleSegment) -> Result<Uuid> {
        segment.validate()?;
        let id = segment.id;
        self.segments.push(segment);
        self.sort();
        Ok(id)
    }

    /// Apply `patch` to the segment with `id`.
    ///
    /// The patched segment is validated before it replaces the stored one,
    /// so a rejected patch leaves the track untouched.
    pub fn update(&mut self, id: Uuid, patch: SegmentPatch) -> Result<&SubtitleSegment> {
        let idx = self.position(id)?;
        let mut updated = self.segments[idx].clone();
        if let Some(start) = patch.start {
            updated.start = start;
        }
        if let Some(end) = patch.end {
            updated.end = end;
        }
        if let Some(text) = patch.text {
            updated.text = text;
        }
        if let Some(speaker) = patch.speaker {
            updated.speaker = speaker;
        }
        updated.validate()?;

        self.segments[idx] = updated;
        self.sort();
        let idx = self.position(id)?;
        Ok(&self.segments[idx])
    }

    pub fn remove(&mut self, id: Uuid) -> Option<SubtitleSegment> {
        let idx = self.segments.iter().position(|s| s.id == id)?;
        Some(self.segments.remove(idx))
    }

    pub fn get(&self, id: Uuid) -> Option<&SubtitleSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Segments in chronological order.
    pub fn segments(&self) -> &[SubtitleSegment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment (by start time) covering `t`.
    pub fn active_at(&self, t: f64) -> Option<&SubtitleSegment> {
        self.segments.iter().find(|s| s.contains(t))
    }

    /// Every segment paired with its active flag at `t`; at most one is `true`.
    pub fn with_active_flags(&self, t: f64) -> impl Iterator<Item = (&SubtitleSegment, bool)> {
        let active = self.active_at(t).map(|s| s.id);
        self.segments.iter().map(move |s| (s, Some(s.id) == active))
    }

    /// End of the last cue, or zero for an empty track.
    pub fn end_time(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.segments
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| MediaError::Overlay(format!("no subtitle segment with id {id}")))
    }

    fn sort(&mut self) {
        // Stable: equal start times keep insertion order.
        self.segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    }
}

impl<'a> IntoIterator for &'a SubtitleTrack {
    type Item = &'a SubtitleSegment;
    type IntoIter = std::slice::Iter<'a, SubtitleSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
