use log::warn;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Bounded retry with capped exponential backoff.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay to wait after the current one.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.backoff_factor).min(self.max_delay)
    }
}

/// Runs `operation` until it succeeds or the attempt budget is spent.
pub async fn with_retry<T, E, F, Fut>(options: &RetryOptions, operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(options, |_| true, operation).await
}

/// Like [`with_retry`], but an error for which `should_retry` returns false
/// is propagated immediately without waiting.
pub async fn with_retry_if<T, E, F, Fut, P>(
    options: &RetryOptions,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = options.max_attempts.max(1);
    let mut delay = options.initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Attempt {attempt} failed: {e}");

                if attempt >= max_attempts || !should_retry(&e) {
                    return Err(e);
                }

                tokio::time::sleep(delay).await;
                delay = options.next_delay(delay);
                attempt += 1;
            }
        }
    }
}
