use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

/// Fetch capability used by the extraction strategies.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `url` and return the body as text.
    async fn get_text(&self, url: &str) -> Result<String>;

    /// POST `body` as JSON to `url` and decode the JSON response.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send request: {}", e))?;

        let status = response.status();
        debug!("GET {url} -> {status}");

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(anyhow!("Server returned error {} for {}", status, url));
        }

        Ok(body)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send request: {}", e))?;

        let status = response.status();
        debug!("POST {url} -> {status}");

        let response_text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(anyhow!("Server returned error {} for {}", status, url));
        }

        serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))
    }
}

#[cfg(test)]
pub mod fake {
    //! Scripted fetcher for strategy tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeFetcher {
        routes: Vec<(String, Result<String, String>)>,
        calls: Mutex<Vec<String>>,
        posted: Mutex<Vec<Value>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Any URL starting with `prefix` answers `body`. First match wins.
        pub fn route(mut self, prefix: &str, body: &str) -> Self {
            self.routes.push((prefix.to_string(), Ok(body.to_string())));
            self
        }

        pub fn fail(mut self, prefix: &str, message: &str) -> Self {
            self.routes.push((prefix.to_string(), Err(message.to_string())));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn posted(&self) -> Vec<Value> {
            self.posted.lock().unwrap().clone()
        }

        fn respond(&self, url: &str) -> Result<String> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.routes.iter().find(|(prefix, _)| url.starts_with(prefix.as_str())) {
                Some((_, Ok(body))) => Ok(body.clone()),
                Some((_, Err(message))) => Err(anyhow!("{message}")),
                None => Err(anyhow!("Server returned error 404 Not Found for {url}")),
            }
        }
    }

    #[async_trait]
    impl HttpFetch for FakeFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.respond(url)
        }

        async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
            self.posted.lock().unwrap().push(body.clone());
            let text = self.respond(url)?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}
