use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the transcript pipeline.
///
/// Strategy-level "not applicable" outcomes are not errors; they are `Ok(None)`.
#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("No captions available for this video.")]
    NoCaptions,

    #[error("Could not find video ID.")]
    InvalidVideoId(String),

    #[error("Network unavailable after waiting {} ms", .0.as_millis())]
    Offline(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Unexpected(String),
}

impl TranscriptError {
    /// Whether retrying the whole extraction could change the outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TranscriptError::NoCaptions
                | TranscriptError::InvalidVideoId(_)
                | TranscriptError::Offline(_)
        )
    }
}

impl From<std::io::Error> for TranscriptError {
    fn from(e: std::io::Error) -> Self {
        TranscriptError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for TranscriptError {
    fn from(e: serde_json::Error) -> Self {
        TranscriptError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_captions_is_terminal() {
        let err = TranscriptError::NoCaptions;
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("No captions available"));
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(TranscriptError::Storage("disk full".into()).is_retryable());
        assert!(TranscriptError::Unexpected("boom".into()).is_retryable());
        assert!(!TranscriptError::Offline(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn offline_reports_sub_second_deadlines() {
        let err = TranscriptError::Offline(Duration::from_millis(500));
        assert_eq!(err.to_string(), "Network unavailable after waiting 500 ms");
    }
}
