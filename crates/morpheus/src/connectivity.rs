//! Best-effort internet reachability probe

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::ConnectivityConfig;
use crate::error::{MorpheusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkState {
  pub is_connected: bool,
  pub is_internet_reachable: bool,
}

impl NetworkState {
  pub fn online() -> Self {
    Self { is_connected: true, is_internet_reachable: true }
  }

  pub fn offline() -> Self {
    Self { is_connected: false, is_internet_reachable: false }
  }
}

/// Reachability check; implementations never error, failure means offline
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
  async fn check(&self) -> NetworkState;
}

/// `HEAD` request against a well-known URL
pub struct HttpProbe {
  client: Client,
  url: String,
}

impl HttpProbe {
  pub fn new(config: &ConnectivityConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| MorpheusError::Remote(format!("failed to create HTTP client: {e}")))?;

    Ok(Self { client, url: config.probe_url.clone() })
  }
}

#[async_trait]
impl ConnectivityCheck for HttpProbe {
  async fn check(&self) -> NetworkState {
    match self.client.head(&self.url).send().await {
      Ok(response) => {
        tracing::debug!(status = %response.status(), url = %self.url, "connectivity probe answered");
        NetworkState::online()
      }
      Err(e) => {
        tracing::debug!(error = %e, url = %self.url, "connectivity probe failed");
        NetworkState::offline()
      }
    }
  }
}

/// Fixed answer, used for `--offline` and in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub NetworkState);

impl FixedConnectivity {
  pub fn online() -> Self {
    Self(NetworkState::online())
  }

  pub fn offline() -> Self {
    Self(NetworkState::offline())
  }
}

#[async_trait]
impl ConnectivityCheck for FixedConnectivity {
  async fn check(&self) -> NetworkState {
    self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fixed_connectivity() {
    assert!(FixedConnectivity::online().check().await.is_connected);
    assert!(!FixedConnectivity::offline().check().await.is_internet_reachable);
  }

  #[tokio::test]
  async fn test_unreachable_probe_reports_offline() {
    // Port 9 on loopback is discard; nothing listens there in test environments
    let config = ConnectivityConfig { probe_url: "http://127.0.0.1:9".to_string(), timeout_secs: 2 };
    let probe = HttpProbe::new(&config).unwrap();

    assert_eq!(probe.check().await, NetworkState::offline());
  }
}
