//! Caption extraction strategies.
//!
//! Every strategy follows the same shape: locate a timed-text URL for the
//! video (the part that differs per strategy), fetch it under the retry
//! policy, parse the timed-text document and collect its segments. A strategy
//! that cannot find what it is looking for answers `Ok(None)`.

pub mod caption_tracks;
pub mod initial_data;
pub mod innertube;
pub mod legacy;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::http::HttpFetch;
use crate::retry::{RetryOptions, with_retry};
use crate::transcript::{Segment, TranscriptData};

pub use caption_tracks::CaptionTracks;
pub use initial_data::InitialData;
pub use innertube::InnerTube;
pub use legacy::LegacyListing;

/// One independent way of obtaining a transcript.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when this strategy does not apply to the video.
    async fn attempt(&self, video_id: &str) -> Result<Option<TranscriptData>>;
}

/// Finds the timed-text URL for a video.
#[async_trait]
pub trait TrackLocator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self, ctx: &ExtractContext, video_id: &str) -> Result<Option<String>>;
}

/// Collaborators and settings shared by all strategies.
pub struct ExtractContext {
    pub http: Arc<dyn HttpFetch>,
    pub retry: RetryOptions,
    pub base_url: String,
    pub language: String,
}

impl ExtractContext {
    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}/watch?v={}", self.base_url, video_id)
    }

    pub async fn fetch_page(&self, video_id: &str) -> Result<String> {
        let html = self.http.get_text(&self.watch_url(video_id)).await?;
        debug!("Fetched watch page for {video_id}: {} bytes", html.len());
        Ok(html)
    }

    pub async fn get_with_retry(&self, url: &str) -> Result<String> {
        with_retry(&self.retry, || self.http.get_text(url)).await
    }

    pub async fn post_with_retry(&self, url: &str, body: &Value) -> Result<Value> {
        with_retry(&self.retry, || self.http.post_json(url, body)).await
    }
}

/// A [`Strategy`] built from a locator plus the shared fetch-and-parse tail.
pub struct TimedTextStrategy<L> {
    locator: L,
    ctx: Arc<ExtractContext>,
}

impl<L: TrackLocator> TimedTextStrategy<L> {
    pub fn new(locator: L, ctx: Arc<ExtractContext>) -> Self {
        Self { locator, ctx }
    }
}

#[async_trait]
impl<L: TrackLocator> Strategy for TimedTextStrategy<L> {
    fn name(&self) -> &'static str {
        self.locator.name()
    }

    async fn attempt(&self, video_id: &str) -> Result<Option<TranscriptData>> {
        let name = self.name();
        let Some(url) = self.locator.locate(&self.ctx, video_id).await? else {
            debug!("[{name}] no caption track located");
            return Ok(None);
        };

        debug!("[{name}] fetching timed text from {url}");
        let xml = self.ctx.get_with_retry(&url).await?;
        debug!("[{name}] timed text length: {}", xml.len());

        let Some(segments) = parse_timed_text(&xml) else {
            return Ok(None);
        };
        if segments.is_empty() {
            debug!("[{name}] no segments extracted");
            return Ok(None);
        }

        debug!("[{name}] extracted {} segments", segments.len());
        Ok(Some(TranscriptData::new(video_id, segments)))
    }
}

/// The standard strategy chain, highest priority first.
pub fn default_strategies(ctx: Arc<ExtractContext>) -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(TimedTextStrategy::new(InnerTube, ctx.clone())),
        Box::new(TimedTextStrategy::new(CaptionTracks, ctx.clone())),
        Box::new(TimedTextStrategy::new(InitialData, ctx.clone())),
        Box::new(TimedTextStrategy::new(LegacyListing, ctx)),
    ]
}

/// Caption track entry as embedded in player responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: Option<String>,
    pub language_code: Option<String>,
}

/// Picks the track in `language`, else the first one.
pub fn select_track<'a, T, F>(tracks: &'a [T], language: &str, language_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    tracks
        .iter()
        .find(|track| language_of(track) == Some(language))
        .or_else(|| tracks.first())
}

/// Resolves a caption track list to the URL of the preferred track.
pub(crate) fn preferred_track_url(tracks: &[CaptionTrack], language: &str) -> Option<String> {
    let track = select_track(tracks, language, |t| t.language_code.as_deref())?;
    debug!(
        "Using track: {}",
        track.language_code.as_deref().unwrap_or("unknown")
    );
    track.base_url.clone()
}

/// Parses a timed-text document into segments.
///
/// `None` when the document is not well-formed. Every `<text>` element is
/// collected regardless of nesting depth.
pub fn parse_timed_text(xml: &str) -> Option<Vec<Segment>> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("XML parsing error: {e}");
            return None;
        }
    };

    let segments = doc
        .descendants()
        .filter(|node| node.has_tag_name("text"))
        .map(|node| Segment {
            start: number_attribute(node, "start"),
            duration: number_attribute(node, "dur"),
            text: text_content(node).trim().to_string(),
        })
        .collect();

    Some(segments)
}

fn number_attribute(node: roxmltree::Node, name: &str) -> f64 {
    node.attribute(name)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub(crate) fn text_content(node: roxmltree::Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Finds the first pattern that matches and decodes the JSON value that
/// starts at the last character of the match.
///
/// Patterns must end with the value's opening `{` or `[`. A pattern whose
/// match does not decode falls through to the next one.
pub(crate) fn embedded_json(html: &str, patterns: &[Regex]) -> Option<Value> {
    for (index, pattern) in patterns.iter().enumerate() {
        let Some(found) = pattern.find(html) else {
            continue;
        };

        let start = found.end() - 1;
        let mut values = serde_json::Deserializer::from_str(&html[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                debug!("Embedded JSON located with pattern #{index}");
                return Some(value);
            }
            Some(Err(e)) => debug!("Pattern #{index} matched but JSON did not parse: {e}"),
            None => {}
        }
    }
    None
}

pub(crate) fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("extraction pattern is a valid regex"))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::http::fake::FakeFetcher;
    use std::time::Duration;

    pub const BASE: &str = "https://www.youtube.com";

    pub const TIMED_TEXT: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
  <text start="0.5" dur="1.25">Hello &amp; welcome</text>
  <text start="1.75" dur="2">  second line  </text>
</transcript>"#;

    pub fn context(fetcher: Arc<FakeFetcher>) -> Arc<ExtractContext> {
        Arc::new(ExtractContext {
            http: fetcher,
            retry: RetryOptions {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                backoff_factor: 2.0,
            },
            base_url: BASE.to_string(),
            language: "en".to_string(),
        })
    }
}
