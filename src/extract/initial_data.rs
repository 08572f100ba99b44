use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::{ExtractContext, TrackLocator, compile, embedded_json};

/// Assignment forms seen for the initial page state blob.
static INITIAL_DATA: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"(?:window\s*\[\s*["']ytInitialData["']\s*\]|ytInitialData)\s*=\s*\{"#,
        r#"var ytInitialData\s*=\s*\{"#,
        r#"window\["ytInitialData"\]\s*=\s*\{"#,
        r#"ytInitialData\s*=\s*\{"#,
        r#"ytInitialData"\]\s*=\s*\{"#,
    ])
});

const TRANSCRIPT_RENDERER: &str = "/engagementPanelSectionListRenderer/content/transcriptRenderer";

const TRANSCRIPT_PARAMS: &str = "/footer/transcriptFooterRenderer/languageMenu/sortFilterSubMenuRenderer/subMenuItems/0/serviceEndpoint/getTranscriptEndpoint/params";

/// Follows the transcript engagement panel in the initial page state to the
/// opaque parameters of the transcript endpoint.
pub struct InitialData;

#[async_trait]
impl TrackLocator for InitialData {
    fn name(&self) -> &'static str {
        "initial-data"
    }

    async fn locate(&self, ctx: &ExtractContext, video_id: &str) -> Result<Option<String>> {
        let html = ctx.fetch_page(video_id).await?;

        let Some(data) = embedded_json(&html, &INITIAL_DATA) else {
            debug!("[initial-data] no ytInitialData found with any pattern");
            return Ok(None);
        };

        let Some(params) = transcript_params(&data) else {
            return Ok(None);
        };
        debug!("[initial-data] transcript params: {params}");

        Ok(Some(format!(
            "{}/api/timedtext?v={}&params={}",
            ctx.base_url, video_id, params
        )))
    }
}

fn transcript_params(data: &Value) -> Option<String> {
    let Some(panels) = data.get("engagementPanels").and_then(Value::as_array) else {
        debug!("[initial-data] no engagementPanels in page state");
        return None;
    };
    debug!("[initial-data] found {} engagement panels", panels.len());

    let Some(renderer) = panels.iter().find_map(|panel| panel.pointer(TRANSCRIPT_RENDERER)) else {
        debug!("[initial-data] no transcript panel found");
        return None;
    };

    let params = renderer.pointer(TRANSCRIPT_PARAMS).and_then(Value::as_str);
    if params.is_none() {
        debug!("[initial-data] transcript panel has no endpoint params");
    }
    params.map(str::to_string)
}
