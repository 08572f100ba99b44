use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::{ExtractContext, TrackLocator, select_track};

#[derive(Debug, Clone, PartialEq)]
struct ListedTrack {
    lang_code: Option<String>,
    name: String,
}

/// Uses the timed-text track listing endpoint.
pub struct LegacyListing;

#[async_trait]
impl TrackLocator for LegacyListing {
    fn name(&self) -> &'static str {
        "legacy-listing"
    }

    async fn locate(&self, ctx: &ExtractContext, video_id: &str) -> Result<Option<String>> {
        let list_url = format!("{}/api/timedtext?type=list&v={}", ctx.base_url, video_id);
        debug!("[legacy-listing] fetching track list from {list_url}");

        let listing = ctx.get_with_retry(&list_url).await?;
        let Some(tracks) = parse_track_list(&listing) else {
            return Ok(None);
        };
        debug!("[legacy-listing] found {} tracks", tracks.len());

        let Some(track) = select_track(&tracks, &ctx.language, |t| t.lang_code.as_deref()) else {
            debug!("[legacy-listing] no tracks available");
            return Ok(None);
        };

        let lang = track.lang_code.as_deref().unwrap_or_default();
        debug!("[legacy-listing] using track: lang={lang}, name={}", track.name);

        Ok(Some(format!(
            "{}/api/timedtext?lang={}&v={}&name={}",
            ctx.base_url,
            urlencoding::encode(lang),
            video_id,
            urlencoding::encode(&track.name)
        )))
    }
}

/// `None` when the listing is not well-formed XML.
fn parse_track_list(xml: &str) -> Option<Vec<ListedTrack>> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("[legacy-listing] XML parsing error: {e}");
            return None;
        }
    };

    let tracks = doc
        .descendants()
        .filter(|node| node.has_tag_name("track"))
        .map(|node| ListedTrack {
            lang_code: node.attribute("lang_code").map(str::to_string),
            name: node.attribute("name").unwrap_or_default().to_string(),
        })
        .collect();

    Some(tracks)
}
