use anyhow::{Result, anyhow};
use log::info;

use crate::config::ClientConfig;
use crate::server::{TranscriptPayload, TranscriptResponse};
use crate::transcript::TranscriptData;

pub async fn check_server_health(client: &reqwest::Client, server_url: &str) -> Result<()> {
    info!("Checking server health at: {server_url}/api/v1/health");

    let response = client
        .get(format!("{server_url}/api/v1/health"))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to connect to server: {}", e))?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(anyhow!("Server health check failed: {}", response.status()))
    }
}

pub async fn send_transcript_request(
    client: &reqwest::Client,
    config: &ClientConfig,
) -> Result<TranscriptData> {
    info!(
        "Requesting transcript for {} from: {}/api/v1/transcript",
        config.video_id, config.server_url
    );

    let response = client
        .post(format!("{}/api/v1/transcript", config.server_url))
        .json(&serde_json::json!({
            "action": "getTranscript",
            "videoId": config.video_id,
        }))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response: {}", e))?;

    if !status.is_success() {
        return Err(anyhow!(
            "Server returned error {}: {}",
            status,
            response_text
        ));
    }

    let parsed: TranscriptResponse = serde_json::from_str(&response_text)
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    into_transcript(parsed.transcript_data)
}

fn into_transcript(payload: TranscriptPayload) -> Result<TranscriptData> {
    match payload {
        TranscriptPayload::Transcript {
            video_id, segments, ..
        } => Ok(TranscriptData::new(video_id, segments)),
        TranscriptPayload::Error { error } => Err(anyhow!(error)),
    }
}

/// Fetches a transcript from a running `caption-fetch serve` instance.
pub async fn fetch_remote(config: &ClientConfig) -> Result<TranscriptData> {
    let client = reqwest::Client::new();
    check_server_health(&client, &config.server_url).await.map_err(|e| {
        anyhow!("{e}\nMake sure the server is running: caption-fetch serve")
    })?;
    send_transcript_request(&client, config).await
}
