use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

use super::{CaptionTrack, ExtractContext, TrackLocator, compile, embedded_json, preferred_track_url};

static API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid API key pattern")
});

static CLIENT_CONTEXT: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r#""INNERTUBE_CONTEXT":\s*\{"#]));

/// Client context sent when the page does not embed one.
pub fn default_context() -> Value {
    json!({
        "client": {
            "clientName": "WEB",
            "clientVersion": "2.20250101.01.00"
        }
    })
}

/// Asks the player-data endpoint for the caption track list, authenticated
/// with the API key and client context scraped from the watch page.
pub struct InnerTube;

#[async_trait]
impl TrackLocator for InnerTube {
    fn name(&self) -> &'static str {
        "innertube"
    }

    async fn locate(&self, ctx: &ExtractContext, video_id: &str) -> Result<Option<String>> {
        let html = ctx.fetch_page(video_id).await?;

        let Some(api_key) = API_KEY.captures(&html).map(|c| c[1].to_string()) else {
            debug!("[innertube] no API key found");
            return Ok(None);
        };
        debug!(
            "[innertube] found API key: {}...",
            api_key.chars().take(8).collect::<String>()
        );

        let context = match embedded_json(&html, &CLIENT_CONTEXT) {
            Some(context @ Value::Object(_)) => {
                debug!("[innertube] extracted client context from page");
                context
            }
            _ => {
                debug!("[innertube] using default client context");
                default_context()
            }
        };

        let url = format!("{}/youtubei/v1/player?key={}", ctx.base_url, api_key);
        let payload = json!({
            "context": context,
            "videoId": video_id,
        });
        let player = ctx.post_with_retry(&url, &payload).await?;

        let tracks: Vec<CaptionTrack> = player
            .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
            .cloned()
            .and_then(|tracks| serde_json::from_value(tracks).ok())
            .unwrap_or_default();

        if tracks.is_empty() {
            debug!("[innertube] no captions in player response");
            return Ok(None);
        }
        debug!("[innertube] found {} caption tracks", tracks.len());

        Ok(preferred_track_url(&tracks, &ctx.language))
    }
}
