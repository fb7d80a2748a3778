//! Public endpoint discovery through the tunnel control API
//!
//! The tunnel process needs a moment after spawn before its control API
//! answers and its tunnels are up. Discovery polls the API under a bounded
//! [`RetryPolicy`] until every tunnel declared in the descriptor is listed.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use ra_core::error::{BoxError, DiscoveryError};
use ra_core::{EndpointName, TunnelDescriptor};

use super::RetryPolicy;

/// Control API response listing active tunnels
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TunnelList {
    #[serde(default)]
    pub tunnels: Vec<ApiTunnel>,
}

/// One tunnel as reported by the control API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTunnel {
    pub name: String,
    pub public_url: String,
}

/// A live public endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTunnel {
    pub name: EndpointName,
    pub public_url: Url,
    pub host: String,
    pub port: u16,
}

impl DiscoveredTunnel {
    /// Validate a reported tunnel against the descriptor
    pub fn from_api(
        tunnel: &ApiTunnel,
        descriptor: &TunnelDescriptor,
    ) -> Result<Self, DiscoveryError> {
        if !descriptor.declares(&tunnel.name) {
            return Err(DiscoveryError::UnknownTunnel(tunnel.name.clone()));
        }
        let name: EndpointName = tunnel
            .name
            .parse()
            .map_err(DiscoveryError::UnknownTunnel)?;

        let invalid = |reason: &str| DiscoveryError::InvalidUrl {
            name: tunnel.name.clone(),
            url: tunnel.public_url.clone(),
            reason: reason.to_string(),
        };

        let public_url = Url::parse(&tunnel.public_url).map_err(|e| invalid(&e.to_string()))?;
        let host = public_url
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .to_string();
        let port = public_url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            name,
            public_url,
            host,
            port,
        })
    }
}

/// Source of the active tunnel list
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Fetch the tunnel list once
    async fn list_tunnels(&self) -> Result<TunnelList, BoxError>;
}

/// Control API reached over loopback HTTP
pub struct HttpControlApi {
    client: reqwest::Client,
    url: String,
}

impl HttpControlApi {
    /// Create a client with a per-request timeout
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ControlApi for HttpControlApi {
    async fn list_tunnels(&self) -> Result<TunnelList, BoxError> {
        let list = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<TunnelList>()
            .await?;
        Ok(list)
    }
}

/// Polls the control API until the declared tunnels are live
pub struct TunnelDiscoveryClient<A> {
    api: A,
    policy: RetryPolicy,
    /// Report every retry on the console
    debug: bool,
}

impl<A: ControlApi> TunnelDiscoveryClient<A> {
    pub fn new(api: A, policy: RetryPolicy, debug: bool) -> Self {
        Self { api, policy, debug }
    }

    /// Discover the public endpoint of every declared tunnel
    ///
    /// Transport failures and partially populated lists are retried within
    /// the policy bound. An undeclared tunnel name fails immediately.
    pub async fn discover(
        &self,
        descriptor: &TunnelDescriptor,
    ) -> Result<Vec<DiscoveredTunnel>, DiscoveryError> {
        let mut attempt = 1;

        loop {
            let delay = self.policy.delay_for(attempt);
            match self.api.list_tunnels().await {
                Ok(list) => {
                    let found = resolve(&list, descriptor)?;
                    let missing: Vec<String> = descriptor
                        .endpoint_names()
                        .filter(|name| !found.contains_key(name))
                        .map(|name| name.to_string())
                        .collect();

                    if missing.is_empty() {
                        tracing::info!("Discovered {} tunnel(s)", found.len());
                        return Ok(found.into_values().collect());
                    }
                    if !self.policy.allows_retry_after(attempt) {
                        return Err(DiscoveryError::Incomplete {
                            attempts: attempt,
                            missing,
                        });
                    }
                    let reason = format!("waiting for {}", missing.join(", "));
                    self.report_retry(attempt, &reason, delay);
                }
                Err(e) => {
                    if !self.policy.allows_retry_after(attempt) {
                        return Err(DiscoveryError::Unreachable {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    self.report_retry(attempt, &e.to_string(), delay);
                }
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn report_retry(&self, attempt: u32, reason: &str, delay: Duration) {
        if self.debug {
            tracing::warn!(
                "Tunnels not ready (attempt {}/{}): {}. Retrying in {:?}",
                attempt,
                self.policy.max_attempts(),
                reason,
                delay
            );
        } else {
            tracing::debug!("Tunnels not ready (attempt {}): {}", attempt, reason);
        }
    }
}

/// Validate every reported tunnel and index them by name
///
/// The first report for a name wins.
fn resolve(
    list: &TunnelList,
    descriptor: &TunnelDescriptor,
) -> Result<BTreeMap<EndpointName, DiscoveredTunnel>, DiscoveryError> {
    let mut found = BTreeMap::new();
    for tunnel in &list.tunnels {
        let discovered = DiscoveredTunnel::from_api(tunnel, descriptor)?;
        found.entry(discovered.name).or_insert(discovered);
    }
    Ok(found)
}
