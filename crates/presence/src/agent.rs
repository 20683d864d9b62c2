//! Heartbeat agent: the client side of the protocol.
//!
//! The agent registers once to obtain an identity, then renews it on a fixed
//! interval for the life of the process. A failed renewal does not discard
//! the identity: transport errors are retried on the next tick, and a
//! rejection (the server no longer knows the identity) is reported but does
//! not trigger re-registration.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

/// Default server base URL the agent talks to.
pub const DEFAULT_SERVER: &str = "http://localhost:8000/";

/// Default seconds between keep-alive calls.
pub const DEFAULT_RENEW_INTERVAL_SECS: u64 = 30;

/// Agent configuration surface.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the presence server.
    pub server: String,
    /// Whole seconds between keep-alive calls. Must be positive.
    pub renew_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            renew_interval_secs: DEFAULT_RENEW_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("renew interval must be a positive number of seconds")]
    InvalidInterval,
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0} from server")]
    UnexpectedStatus(StatusCode),
}

/// Protocol outcome of one renewal. Distinct from a transport failure:
/// both are answers from the server, only one means "re-register".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewStatus {
    Acknowledged,
    Rejected,
}

/// Client that registers with a presence server and keeps the registration
/// alive.
pub struct HeartbeatAgent {
    http: reqwest::Client,
    base: String,
    interval: Duration,
}

impl HeartbeatAgent {
    /// Build an agent, validating the configuration before any network
    /// activity.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        if config.renew_interval_secs == 0 {
            return Err(AgentError::InvalidInterval);
        }
        let base = if config.server.ends_with('/') {
            config.server
        } else {
            format!("{}/", config.server)
        };
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            interval: Duration::from_secs(config.renew_interval_secs),
        })
    }

    /// Request a fresh identity from the server.
    pub async fn register(&self) -> Result<String, AgentError> {
        let response = self.http.get(format!("{}get-id", self.base)).send().await?;
        if !response.status().is_success() {
            return Err(AgentError::UnexpectedStatus(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Renew `identity` once.
    pub async fn renew(&self, identity: &str) -> Result<RenewStatus, AgentError> {
        let response = self
            .http
            .get(format!("{}keep-alive/{identity}", self.base))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(RenewStatus::Acknowledged),
            StatusCode::UNAUTHORIZED => Ok(RenewStatus::Rejected),
            status => Err(AgentError::UnexpectedStatus(status)),
        }
    }

    /// Register, then renew forever. Returns only if the initial
    /// registration fails.
    pub async fn run(&self) -> Result<(), AgentError> {
        let identity = self.register().await?;
        info!(%identity, server = %self.base, "registered with server");

        loop {
            tokio::time::sleep(self.interval).await;
            match self.renew(&identity).await {
                Ok(RenewStatus::Acknowledged) => info!(%identity, "keep-alive acknowledged"),
                Ok(RenewStatus::Rejected) => {
                    // TODO: re-register on rejection instead of only reporting
                    // it; today recovery means restarting the agent.
                    warn!(%identity, "keep-alive rejected, server no longer knows this identity");
                }
                Err(err) => {
                    warn!(%identity, error = %err, "keep-alive failed, retrying next interval");
                }
            }
        }
    }
}
