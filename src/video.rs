use reqwest::Url;

use crate::error::{Result, TranscriptError};

/// Accepts a watch URL (`?v=`), a `youtu.be` short link, or a bare id.
pub fn parse_video_id(input: &str) -> Result<String> {
    let input = input.trim();

    if let Ok(url) = Url::parse(input) {
        if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
            if is_video_id(&id) {
                return Ok(id.into_owned());
            }
        }
        if url.host_str() == Some("youtu.be") {
            if let Some(id) = url.path_segments().and_then(|mut segments| segments.next()) {
                if is_video_id(id) {
                    return Ok(id.to_string());
                }
            }
        }
        return Err(TranscriptError::InvalidVideoId(input.to_string()));
    }

    if is_video_id(input) {
        Ok(input.to_string())
    } else {
        Err(TranscriptError::InvalidVideoId(input.to_string()))
    }
}

fn is_video_id(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
