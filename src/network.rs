use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::error::{Result, TranscriptError};

/// Tracks whether the host is reachable and lets callers wait for it.
#[derive(Clone)]
pub struct NetworkGate {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl NetworkGate {
    pub fn new(online: bool) -> Self {
        let (sender, receiver) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.receiver.borrow()
    }

    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            info!("Network is now {}", if online { "online" } else { "offline" });
            *current = online;
            true
        });
    }

    /// Resolves once connectivity is reported. `None` waits without bound.
    pub async fn wait_for_online(&self, deadline: Option<Duration>) -> Result<()> {
        if self.is_online() {
            return Ok(());
        }

        debug!("Waiting for network connectivity");
        let mut receiver = self.receiver.clone();
        let wait = receiver.wait_for(|online| *online);

        let outcome = match deadline {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| TranscriptError::Offline(limit))?,
            None => wait.await,
        };

        outcome
            .map(|_| ())
            .map_err(|_| TranscriptError::Unexpected("Connectivity monitor stopped".into()))
    }

    /// Periodically probes `host:port` and publishes the result.
    pub fn spawn_probe(&self, host: String, port: u16, interval: Duration) {
        let gate = self.clone();
        tokio::spawn(async move {
            loop {
                let online = probe(&host, port, interval).await;
                gate.set_online(online);
                tokio::time::sleep(interval).await;
            }
        });
    }
}

/// Attempts a TCP connection, bounded by `limit`.
pub async fn probe(host: &str, port: u16, limit: Duration) -> bool {
    match tokio::time::timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("Connectivity probe to {host}:{port} failed: {e}");
            false
        }
        Err(_) => {
            warn!("Connectivity probe to {host}:{port} timed out");
            false
        }
    }
}
