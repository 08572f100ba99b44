use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One caption cue. Times are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Srt,
    Vtt,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" => Ok(OutputFormat::Vtt),
            other => Err(format!("Unsupported format: {other} (expected text, srt or vtt)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        };
        f.write_str(name)
    }
}

/// Normalized transcript for a single video.
///
/// Formatted output is memoized per `(format, include_timestamps)` for the
/// lifetime of the instance. The memo is never serialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptData {
    pub video_id: String,
    pub segments: Vec<Segment>,
    #[serde(skip)]
    formatted: HashMap<(OutputFormat, bool), String>,
}

impl PartialEq for TranscriptData {
    fn eq(&self, other: &Self) -> bool {
        self.video_id == other.video_id && self.segments == other.segments
    }
}

impl TranscriptData {
    pub fn new(video_id: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            video_id: video_id.into(),
            segments,
            formatted: HashMap::new(),
        }
    }

    pub fn clear_cache(&mut self) {
        self.formatted.clear();
    }

    /// Returns the transcript rendered as `format`, computing it at most once.
    /// `include_timestamps` only changes plain-text output.
    pub fn formatted(&mut self, format: OutputFormat, include_timestamps: bool) -> &str {
        if !self.formatted.contains_key(&(format, include_timestamps)) {
            let rendered = match format {
                OutputFormat::Text => self.to_text(include_timestamps),
                OutputFormat::Srt => self.to_srt(),
                OutputFormat::Vtt => self.to_vtt(),
            };
            self.formatted.insert((format, include_timestamps), rendered);
        }
        &self.formatted[&(format, include_timestamps)]
    }

    pub fn to_text(&self, include_timestamps: bool) -> String {
        self.segments
            .iter()
            .map(|segment| {
                let text = segment.text.trim();
                if include_timestamps {
                    format!("[{}] {}", format_clock(segment.start), text)
                } else {
                    text.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_srt(&self) -> String {
        self.segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                format!(
                    "{}\n{} --> {}\n{}\n",
                    index + 1,
                    format_timestamp(segment.start, ','),
                    format_timestamp(segment.end(), ','),
                    segment.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_vtt(&self) -> String {
        let body = self
            .segments
            .iter()
            .map(|segment| {
                format!(
                    "{} --> {}\n{}\n",
                    format_timestamp(segment.start, '.'),
                    format_timestamp(segment.end(), '.'),
                    segment.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("WEBVTT\n\n{body}")
    }

    /// Suggested download name, e.g. `youtube_transcript_abc123.srt`.
    pub fn filename(&self, format: OutputFormat) -> String {
        format!("youtube_transcript_{}.{}", self.video_id, format.extension())
    }
}

/// `MM:SS`; minutes keep growing past 59.
fn format_clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{minutes:02}:{secs:02}")
}

/// `HH:MM:SS<sep>mmm`; hours are not wrapped at 24.
fn format_timestamp(seconds: f64, separator: char) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let millis = ((seconds % 1.0) * 1000.0).floor() as u64;
    format!("{hours:02}:{minutes:02}:{secs:02}{separator}{millis:03}")
}
