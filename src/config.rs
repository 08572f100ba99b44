use dotenvy::dotenv;
use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryOptions;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub base_url: String,
    pub language: String,
    pub user_agent: String,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub retry: RetryOptions,
    /// `None` waits for connectivity indefinitely.
    pub online_timeout: Option<Duration>,
    pub probe_interval: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        dotenv().ok();
        let online_timeout_secs: u64 = env_or("CAPTION_FETCH_ONLINE_TIMEOUT_SECS", 30);
        Self {
            base_url: env_or("CAPTION_FETCH_BASE_URL", "https://www.youtube.com".to_string()),
            language: env_or("CAPTION_FETCH_LANGUAGE", "en".to_string()),
            user_agent: env_or("CAPTION_FETCH_USER_AGENT", DEFAULT_USER_AGENT.to_string()),
            cache_path: std::env::var("CAPTION_FETCH_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_cache_path()),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache_capacity: 50,
            retry: RetryOptions::default(),
            online_timeout: (online_timeout_secs > 0).then(|| Duration::from_secs(online_timeout_secs)),
            probe_interval: Duration::from_secs(5),
        }
    }
}

impl ExtractorConfig {
    /// Host and port of `base_url`, used for the connectivity probe.
    pub fn probe_address(&self) -> Option<(String, u16)> {
        let url = reqwest::Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?.to_string();
        Some((host, url.port_or_known_default()?))
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("caption-fetch")
        .join("cache.json")
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid value for {key}: {raw:?}");
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub video_id: String,
}

impl ClientConfig {
    pub fn new(server_url: String, video_id: String) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            video_id,
        }
    }
}
