use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{JsonFileStore, KeyValueStore, MemoryStore, TranscriptCache};
use crate::config::ExtractorConfig;
use crate::error::{Result, TranscriptError};
use crate::extract::{ExtractContext, Strategy, default_strategies};
use crate::http::ReqwestFetcher;
use crate::network::{NetworkGate, probe};
use crate::retry::{RetryOptions, with_retry_if};
use crate::transcript::TranscriptData;

/// Cache lookup, connectivity wait, then the strategy chain under retry.
pub struct TranscriptService {
    cache: TranscriptCache,
    gate: NetworkGate,
    strategies: Vec<Box<dyn Strategy>>,
    retry: RetryOptions,
    online_timeout: Option<Duration>,
}

/// Outcome of running one strategy in isolation.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub strategy: &'static str,
    pub success: bool,
    pub elapsed_ms: u128,
    pub segments: usize,
    pub error: Option<String>,
}

impl TranscriptService {
    pub fn new(
        cache: TranscriptCache,
        gate: NetworkGate,
        strategies: Vec<Box<dyn Strategy>>,
        retry: RetryOptions,
        online_timeout: Option<Duration>,
    ) -> Self {
        Self {
            cache,
            gate,
            strategies,
            retry,
            online_timeout,
        }
    }

    /// Wires the production collaborators: reqwest, the JSON file cache and
    /// a connectivity probe against the configured host. Without `persist`
    /// the cache only lives as long as the process.
    pub async fn from_config(config: &ExtractorConfig, persist: bool) -> anyhow::Result<Self> {
        let http = Arc::new(ReqwestFetcher::new(&config.user_agent)?);
        let ctx = Arc::new(ExtractContext {
            http,
            retry: config.retry.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        });

        let store: Box<dyn KeyValueStore> = if persist {
            Box::new(JsonFileStore::new(&config.cache_path))
        } else {
            Box::new(MemoryStore::new())
        };
        let cache = TranscriptCache::new(store, config.cache_ttl, config.cache_capacity);

        let gate = match config.probe_address() {
            Some((host, port)) => {
                let online = probe(&host, port, config.probe_interval).await;
                let gate = NetworkGate::new(online);
                gate.spawn_probe(host, port, config.probe_interval);
                gate
            }
            None => {
                warn!("No host in base URL {}, assuming online", config.base_url);
                NetworkGate::new(true)
            }
        };

        Ok(Self::new(
            cache,
            gate,
            default_strategies(ctx),
            config.retry.clone(),
            config.online_timeout,
        ))
    }

    pub async fn get_transcript(&self, video_id: &str) -> Result<TranscriptData> {
        info!("Starting transcript extraction for {video_id}");

        if let Some(cached) = self.cached(video_id) {
            info!("Retrieved transcript for {video_id} from cache");
            return Ok(cached);
        }

        self.gate.wait_for_online(self.online_timeout).await?;

        let transcript = with_retry_if(
            &self.retry,
            TranscriptError::is_retryable,
            || self.run_strategies(video_id),
        )
        .await?;

        if let Err(e) = self.cache.put(video_id, &transcript) {
            warn!("Failed to cache transcript for {video_id}: {e}");
        }

        info!(
            "Transcript for {video_id} ready: {} segments",
            transcript.segments.len()
        );
        Ok(transcript)
    }

    /// Runs every strategy once, in order, without cache or retry.
    pub async fn probe(&self, video_id: &str) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let started = Instant::now();
            let outcome = strategy.attempt(video_id).await;
            let elapsed_ms = started.elapsed().as_millis();

            let report = match outcome {
                Ok(Some(transcript)) => ProbeReport {
                    strategy: strategy.name(),
                    success: true,
                    elapsed_ms,
                    segments: transcript.segments.len(),
                    error: None,
                },
                Ok(None) => ProbeReport {
                    strategy: strategy.name(),
                    success: false,
                    elapsed_ms,
                    segments: 0,
                    error: None,
                },
                Err(e) => ProbeReport {
                    strategy: strategy.name(),
                    success: false,
                    elapsed_ms,
                    segments: 0,
                    error: Some(format!("{e:#}")),
                },
            };
            debug!("Probe result: {report:?}");
            reports.push(report);
        }

        reports
    }

    fn cached(&self, video_id: &str) -> Option<TranscriptData> {
        match self.cache.get(video_id) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Error reading from cache: {e}");
                None
            }
        }
    }

    async fn run_strategies(&self, video_id: &str) -> Result<TranscriptData> {
        debug!("Attempting extraction methods...");

        for strategy in &self.strategies {
            let name = strategy.name();
            debug!("Trying {name}");
            match strategy.attempt(video_id).await {
                Ok(Some(transcript)) => {
                    info!("{name} succeeded");
                    return Ok(transcript);
                }
                Ok(None) => debug!("{name} found nothing"),
                Err(e) => warn!("{name} failed: {e:#}"),
            }
        }

        debug!("All extraction methods failed");
        Err(TranscriptError::NoCaptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Absent,
        Found(usize),
        Fails,
    }

    struct Scripted {
        name: &'static str,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Strategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, video_id: &str) -> anyhow::Result<Option<TranscriptData>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Absent => Ok(None),
                Outcome::Fails => Err(anyhow::anyhow!("connection reset")),
                Outcome::Found(count) => {
                    let segments = (0..count)
                        .map(|i| Segment {
                            start: i as f64,
                            duration: 1.0,
                            text: format!("{} line {i}", self.name),
                        })
                        .collect();
                    Ok(Some(TranscriptData::new(video_id, segments)))
                }
            }
        }
    }

    fn chain(outcomes: Vec<(&'static str, Outcome)>) -> (Vec<Box<dyn Strategy>>, Vec<Arc<AtomicUsize>>) {
        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        let mut counters = Vec::new();
        for (name, outcome) in outcomes {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.push(calls.clone());
            strategies.push(Box::new(Scripted { name, outcome, calls }));
        }
        (strategies, counters)
    }

    fn fast_retry() -> RetryOptions {
        RetryOptions {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryOptions::default()
        }
    }

    fn memory_cache() -> TranscriptCache {
        TranscriptCache::new(
            Box::new(MemoryStore::new()),
            Duration::from_secs(24 * 60 * 60),
            50,
        )
    }

    fn service(strategies: Vec<Box<dyn Strategy>>) -> TranscriptService {
        TranscriptService::new(
            memory_cache(),
            NetworkGate::new(true),
            strategies,
            fast_retry(),
            Some(Duration::from_millis(50)),
        )
    }

    #[tokio::test]
    async fn first_success_wins_and_later_strategies_are_skipped() {
        let (strategies, calls) = chain(vec![
            ("first", Outcome::Absent),
            ("second", Outcome::Fails),
            ("third", Outcome::Found(3)),
            ("fourth", Outcome::Found(9)),
        ]);
        let service = service(strategies);

        let transcript = service.get_transcript("vid").await.unwrap();
        assert_eq!(transcript.segments.len(), 3);
        assert_eq!(transcript.segments[0].text, "third line 0");

        let counts: Vec<usize> = calls.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(counts, vec![1, 1, 1, 0]);
    }

    #[tokio::test]
    async fn no_captions_is_not_retried() {
        let (strategies, calls) = chain(vec![
            ("first", Outcome::Absent),
            ("second", Outcome::Fails),
            ("third", Outcome::Absent),
        ]);
        let service = service(strategies);

        let err = service.get_transcript("vid").await.unwrap_err();
        assert!(matches!(err, TranscriptError::NoCaptions));
        assert!(err.to_string().contains("No captions available"));

        for counter in &calls {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn success_is_cached_and_served_from_cache() {
        let (strategies, calls) = chain(vec![("only", Outcome::Found(2))]);
        let service = service(strategies);

        let first = service.get_transcript("vid").await.unwrap();
        let second = service.get_transcript("vid").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls[0].load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn offline_gate_times_out_before_extraction() {
        let (strategies, calls) = chain(vec![("only", Outcome::Found(1))]);
        let service = TranscriptService::new(
            memory_cache(),
            NetworkGate::new(false),
            strategies,
            fast_retry(),
            Some(Duration::from_millis(10)),
        );

        let err = service.get_transcript("vid").await.unwrap_err();
        assert!(matches!(err, TranscriptError::Offline(_)));
        assert_eq!(calls[0].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gate_checks_the_configured_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ExtractorConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            probe_interval: Duration::from_secs(1),
            ..ExtractorConfig::default()
        };

        let service = TranscriptService::from_config(&config, false).await.unwrap();
        assert!(service.gate.is_online());
        service
            .gate
            .wait_for_online(Some(Duration::from_millis(10)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn probe_reports_each_strategy() {
        let (strategies, calls) = chain(vec![
            ("absent", Outcome::Absent),
            ("broken", Outcome::Fails),
            ("works", Outcome::Found(4)),
        ]);
        let service = service(strategies);

        let reports = service.probe("vid").await;
        assert_eq!(reports.len(), 3);
        assert!(!reports[0].success && reports[0].error.is_none());
        assert_eq!(reports[1].error.as_deref(), Some("connection reset"));
        assert!(reports[2].success);
        assert_eq!(reports[2].segments, 4);

        service.probe("vid").await;
        assert_eq!(calls[2].load(Ordering::SeqCst), 2, "probe bypasses the cache");
    }
}
