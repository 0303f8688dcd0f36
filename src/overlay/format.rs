//! Subtitle serialization: the `M:SS` timeline export, SRT and ASS.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::subtitle::{SubtitleSegment, SubtitleTrack};
use crate::error::{MediaError, Result};

/// Subtitle format type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// Numbered `M:SS --> M:SS` entries separated by blank lines
    #[default]
    Timeline,
    /// `SubRip` format (.srt)
    Srt,
    /// Advanced `SubStation` Alpha (.ass), used for burn-in
    Ass,
}

impl SubtitleFormat {
    /// Get file extension for this format
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Timeline => "txt",
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "timeline" | "txt" => Ok(Self::Timeline),
            "srt" => Ok(Self::Srt),
            "ass" => Ok(Self::Ass),
            other => Err(MediaError::Overlay(format!("unknown subtitle format: {other}"))),
        }
    }
}

/// Format seconds as `M:SS` (minutes are not wrapped into hours).
#[must_use]
pub fn format_timeline_time(secs: f64) -> String {
    let whole = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Format time as SRT timestamp (HH:MM:SS,mmm)
fn format_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format time as ASS timestamp (H:MM:SS.cc)
fn format_ass_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Trait for subtitle generators
pub trait SubtitleGenerator: Send + Sync {
    /// Get the format this generator produces
    fn format(&self) -> SubtitleFormat;

    /// Serialize `track` in chronological order.
    fn generate(&self, track: &SubtitleTrack) -> Result<String>;
}

/// Build the default generator for `format`.
#[must_use]
pub fn generator_for(format: SubtitleFormat) -> Box<dyn SubtitleGenerator> {
    match format {
        SubtitleFormat::Timeline => Box::new(TimelineGenerator),
        SubtitleFormat::Srt => Box::new(SrtGenerator::new()),
        SubtitleFormat::Ass => Box::new(AssGenerator::new()),
    }
}

/// Write `track` to `path` with `generator`.
pub async fn write_subtitles(
    generator: &dyn SubtitleGenerator,
    track: &SubtitleTrack,
    path: &Path,
) -> Result<()> {
    let content = generator.generate(track)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// The plain `M:SS` export.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineGenerator;

impl SubtitleGenerator for TimelineGenerator {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Timeline
    }

    fn generate(&self, track: &SubtitleTrack) -> Result<String> {
        let mut output = String::new();
        for (i, segment) in track.iter().enumerate() {
            writeln!(output, "{}", i + 1)?;
            writeln!(
                output,
                "{} --> {}",
                format_timeline_time(segment.start),
                format_timeline_time(segment.end)
            )?;
            writeln!(output, "{}", segment.text)?;
            writeln!(output)?;
        }
        Ok(output)
    }
}

/// SRT subtitle generator
#[derive(Debug, Clone, Default)]
pub struct SrtGenerator {
    /// Include speaker labels in subtitle text
    pub include_speaker: bool,
}

impl SrtGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable speaker label inclusion
    #[must_use]
    pub fn with_speaker_labels(mut self) -> Self {
        self.include_speaker = true;
        self
    }
}

impl SubtitleGenerator for SrtGenerator {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Srt
    }

    fn generate(&self, track: &SubtitleTrack) -> Result<String> {
        let mut output = String::new();

        for (i, segment) in track.iter().enumerate() {
            writeln!(output, "{}", i + 1)?;
            writeln!(
                output,
                "{} --> {}",
                format_srt_time(segment.start_ms()),
                format_srt_time(segment.end_ms())
            )?;
            match segment.speaker {
                Some(ref speaker) if self.include_speaker => {
                    writeln!(output, "[{speaker}] {}", segment.text)?;
                }
                _ => writeln!(output, "{}", segment.text)?,
            }
            writeln!(output)?;
        }

        Ok(output)
    }
}

/// Style configuration for ASS subtitles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub name: String,
    pub font_name: String,
    pub font_size: u32,
    /// Primary color (AABBGGRR format for ASS)
    pub primary_color: String,
    pub outline_color: String,
    /// Background/shadow color
    pub back_color: String,
    pub bold: bool,
    pub italic: bool,
    pub outline: f32,
    pub shadow: f32,
    /// Alignment (numpad style: 1-9)
    pub alignment: u8,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            font_name: "Arial".to_string(),
            font_size: 48,
            primary_color: "&H00FFFFFF".to_string(), // White
            outline_color: "&H00000000".to_string(), // Black
            back_color: "&H80000000".to_string(),    // Semi-transparent black
            bold: false,
            italic: false,
            outline: 2.0,
            shadow: 1.0,
            alignment: 2, // Bottom center
            margin_l: 40,
            margin_r: 40,
            margin_v: 60,
        }
    }
}

impl SubtitleStyle {
    /// Scale font size and margins from a 1080-line reference to `height`.
    #[must_use]
    pub fn scaled_for_height(mut self, height: u32) -> Self {
        let factor = f64::from(height.max(1)) / 1080.0;
        let scale = |v: u32| ((f64::from(v) * factor).round() as u32).max(1);
        self.font_size = scale(self.font_size);
        self.margin_l = scale(self.margin_l);
        self.margin_r = scale(self.margin_r);
        self.margin_v = scale(self.margin_v);
        self
    }

    fn to_ass_line(&self) -> String {
        format!(
            "Style: {},{},{},{},{},{},{},{},{},0,0,100,100,0,0,1,{},{},{},{},{},{},1",
            self.name,
            self.font_name,
            self.font_size,
            self.primary_color,
            "&H000000FF", // Secondary color (karaoke)
            self.outline_color,
            self.back_color,
            if self.bold { -1 } else { 0 },
            if self.italic { -1 } else { 0 },
            self.outline,
            self.shadow,
            self.alignment,
            self.margin_l,
            self.margin_r,
            self.margin_v
        )
    }
}

/// ASS subtitle generator
#[derive(Debug, Clone)]
pub struct AssGenerator {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub style: SubtitleStyle,
    pub title: String,
}

impl Default for AssGenerator {
    fn default() -> Self {
        Self {
            play_res_x: 1920,
            play_res_y: 1080,
            style: SubtitleStyle::default(),
            title: "castforge export".to_string(),
        }
    }
}

impl AssGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set video resolution, rescaling the default style to match
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.play_res_x = width;
        self.play_res_y = height;
        self.style = self.style.scaled_for_height(height);
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: SubtitleStyle) -> Self {
        self.style = style;
        self
    }

    fn write_header(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "[Script Info]")?;
        writeln!(out, "Title: {}", self.title)?;
        writeln!(out, "ScriptType: v4.00+")?;
        writeln!(out, "PlayResX: {}", self.play_res_x)?;
        writeln!(out, "PlayResY: {}", self.play_res_y)?;
        writeln!(out, "ScaledBorderAndShadow: yes")?;
        writeln!(out)?;

        writeln!(out, "[V4+ Styles]")?;
        writeln!(
            out,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
             OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, \
             ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, \
             MarginL, MarginR, MarginV, Encoding"
        )?;
        writeln!(out, "{}", self.style.to_ass_line())?;
        writeln!(out)?;

        writeln!(out, "[Events]")?;
        writeln!(
            out,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        )
    }
}

/// Escape override braces and line breaks for an ASS `Dialogue` line.
fn escape_ass(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}

/// `Name` is a comma-delimited field: commas and line breaks would shift `Text`.
fn ass_name(speaker: &str) -> String {
    speaker
        .chars()
        .map(|c| if c == ',' || c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

impl SubtitleGenerator for AssGenerator {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Ass
    }

    fn generate(&self, track: &SubtitleTrack) -> Result<String> {
        let mut output = String::new();
        self.write_header(&mut output)?;

        for segment in track {
            writeln!(
                output,
                "Dialogue: 0,{},{},{},{},0,0,0,,{}",
                format_ass_time(segment.start_ms()),
                format_ass_time(segment.end_ms()),
                self.style.name,
                ass_name(segment.speaker.as_deref().unwrap_or("")),
                escape_ass(&segment.text)
            )?;
        }

        Ok(output)
    }
}

/// Parse SRT file content into a sorted track.
pub fn parse_srt(content: &str) -> Result<SubtitleTrack> {
    let mut segments = Vec::new();
    let mut lines = content.lines().peekable();

    while lines.peek().is_some() {
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }

        let Some(seq_line) = lines.next() else {
            break;
        };
        if seq_line.trim().trim_start_matches('\u{feff}').parse::<u32>().is_err() {
            continue;
        }

        let Some(time_line) = lines.next() else {
            break;
        };
        let (start_ms, end_ms) = parse_srt_timestamp_line(time_line)?;

        let mut text_lines = Vec::new();
        while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
            text_lines.push(line);
        }

        segments.push(SubtitleSegment::new(
            start_ms as f64 / 1000.0,
            end_ms as f64 / 1000.0,
            text_lines.join("\n"),
        )?);
    }

    SubtitleTrack::from_segments(segments)
}

/// Parse SRT timestamp line "HH:MM:SS,mmm --> HH:MM:SS,mmm"
fn parse_srt_timestamp_line(line: &str) -> Result<(u64, u64)> {
    let Some((start, end)) = line.split_once("-->") else {
        return Err(MediaError::Overlay(format!("invalid timestamp line: {line}")));
    };
    Ok((parse_srt_timestamp(start.trim())?, parse_srt_timestamp(end.trim())?))
}

/// Parse SRT timestamp "HH:MM:SS,mmm" to milliseconds
fn parse_srt_timestamp(ts: &str) -> Result<u64> {
    let invalid = || MediaError::Overlay(format!("invalid timestamp: {ts}"));
    let parts: Vec<u64> = ts
        .split([',', ':'])
        .map(|p| p.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<_>>()?;
    let [hours, minutes, seconds, millis] = parts[..] else {
        return Err(invalid());
    };
    Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> SubtitleTrack {
        SubtitleTrack::from_segments(vec![
            SubtitleSegment::new(2.5, 4.0, "This is a test.").unwrap(),
            SubtitleSegment::new(0.0, 2.0, "Hello, world!").unwrap().with_speaker("John"),
        ])
        .unwrap()
    }

    #[test]
    fn timeline_time_format() {
        assert_eq!(format_timeline_time(0.0), "0:00");
        assert_eq!(format_timeline_time(9.99), "0:09");
        assert_eq!(format_timeline_time(61.0), "1:01");
        assert_eq!(format_timeline_time(3_725.0), "62:05");
    }

    #[test]
    fn test_srt_time_format() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(61000), "00:01:01,000");
        assert_eq!(format_srt_time(3661500), "01:01:01,500");
    }

    #[test]
    fn test_ass_time_format() {
        assert_eq!(format_ass_time(0), "0:00:00.00");
        assert_eq!(format_ass_time(3661500), "1:01:01.50");
    }

    #[test]
    fn timeline_export_is_numbered_and_chronological() {
        let output = TimelineGenerator.generate(&track()).unwrap();
        assert_eq!(
            output,
            "1\n0:00 --> 0:02\nHello, world!\n\n2\n0:02 --> 0:04\nThis is a test.\n\n"
        );
    }

    #[test]
    fn test_srt_generation() {
        let output = SrtGenerator::new().generate(&track()).unwrap();
        assert!(output.starts_with("1\n00:00:00,000 --> 00:00:02,000\nHello, world!\n"));
        assert!(output.contains("2\n00:00:02,500 --> 00:00:04,000\nThis is a test."));
    }

    #[test]
    fn test_srt_with_speaker() {
        let output = SrtGenerator::new().with_speaker_labels().generate(&track()).unwrap();
        assert!(output.contains("[John] Hello, world!"));
    }

    #[test]
    fn test_ass_generation() {
        let output = AssGenerator::new().generate(&track()).unwrap();
        assert!(output.contains("[Script Info]"));
        assert!(output.contains("[V4+ Styles]"));
        assert!(output.contains("[Events]"));
        assert!(output.contains("Dialogue: 0,0:00:00.00,0:00:02.00,Default,John,0,0,0,,Hello, world!"));
    }

    #[test]
    fn ass_escapes_braces_and_newlines() {
        assert_eq!(escape_ass("a{b}\nc"), "a\\{b\\}\\Nc");
    }

    #[test]
    fn ass_speaker_cannot_shift_dialogue_fields() {
        let track = SubtitleTrack::from_segments(vec![SubtitleSegment::new(0.0, 1.0, "Hello")
            .unwrap()
            .with_speaker("Smith, John\nJr")])
        .unwrap();
        let output = AssGenerator::new().generate(&track).unwrap();

        let dialogue = output.lines().find(|l| l.starts_with("Dialogue:")).unwrap();
        let fields: Vec<&str> = dialogue.splitn(10, ',').collect();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[4], "Smith  John Jr");
        assert_eq!(fields[9], "Hello");
    }

    #[test]
    fn ass_resolution_rescales_style() {
        let gen = AssGenerator::new().with_resolution(1080, 1920);
        assert_eq!(gen.play_res_y, 1920);
        assert_eq!(gen.style.font_size, 85);
    }

    #[test]
    fn test_parse_srt() {
        let content = "1
00:00:02,500 --> 00:00:04,000
This is a test.
With multiple lines.

2
00:00:00,000 --> 00:00:02,000
Hello, world!

";
        let track = parse_srt(content).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.segments()[0].text, "Hello, world!");
        assert!((track.segments()[1].start - 2.5).abs() < 1e-9);
        assert_eq!(track.segments()[1].text, "This is a test.\nWith multiple lines.");
    }

    #[test]
    fn parse_srt_rejects_bad_timestamps() {
        assert!(parse_srt("1\n00:00:01 --> 00:00:02,000\nhi\n").is_err());
        assert!(parse_srt("1\nnot a timestamp\nhi\n").is_err());
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("SRT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert_eq!("timeline".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Timeline);
        assert!("vtt".parse::<SubtitleFormat>().is_err());
        assert_eq!(generator_for(SubtitleFormat::Ass).format(), SubtitleFormat::Ass);
    }
}
