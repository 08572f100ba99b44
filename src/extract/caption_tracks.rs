use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use super::{CaptionTrack, ExtractContext, TrackLocator, compile, embedded_json, preferred_track_url};

/// Ways the caption track array has been embedded in the watch page.
static TRACK_LIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#""captionTracks":\["#,
        r#"(?s)"captions".*?"playerCaptionsTracklistRenderer".*?"captionTracks":\["#,
        r#""playerCaptionsTracklistRenderer":\{"captionTracks":\["#,
        r#""captionTracks":\s*\["#,
    ])
});

/// Reads the caption track list straight out of the watch page markup.
pub struct CaptionTracks;

#[async_trait]
impl TrackLocator for CaptionTracks {
    fn name(&self) -> &'static str {
        "caption-tracks"
    }

    async fn locate(&self, ctx: &ExtractContext, video_id: &str) -> Result<Option<String>> {
        let html = ctx.fetch_page(video_id).await?;

        let Some(raw) = embedded_json(&html, &TRACK_LIST) else {
            debug!("[caption-tracks] no captionTracks found with any pattern");
            return Ok(None);
        };

        let tracks: Vec<CaptionTrack> = match serde_json::from_value(raw) {
            Ok(tracks) => tracks,
            Err(e) => {
                debug!("[caption-tracks] track list did not decode: {e}");
                return Ok(None);
            }
        };
        debug!("[caption-tracks] parsed {} caption tracks", tracks.len());

        Ok(preferred_track_url(&tracks, &ctx.language))
    }
}
