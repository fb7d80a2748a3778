//! Provisioning and exposure orchestrator
//!
//! Drives one strictly linear run:
//!
//! ```text
//! Validating -> Provisioning -> DescriptorBuilt -> Launching -> Discovering -> Serving
//! ```
//!
//! Any failure moves the run to `Failed` with the failing operation as
//! context. Nothing
//! is rolled back. Once serving, the agent idles forever so the tunnel
//! process and the credential changes stay in effect until it is killed.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};

use ra_core::config::{AccessConfig, AgentSettings, RawAccessInputs};
use ra_core::error::AccessError;
use ra_core::TunnelDescriptor;

use crate::output::AccessInstruction;
use crate::provision::{CredentialProvisioner, PrivilegedRunner};
use crate::tunnel::{HttpControlApi, RetryPolicy, TunnelDiscoveryClient, TunnelLauncher};

/// Orchestrator states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Provisioning,
    DescriptorBuilt,
    Launching,
    Discovering,
    Serving,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Provisioning => "provisioning",
            Stage::DescriptorBuilt => "descriptor built",
            Stage::Launching => "launching",
            Stage::Discovering => "discovering",
            Stage::Serving => "serving",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful run up to the serving state
#[derive(Debug)]
pub struct Exposure {
    pub instructions: Vec<AccessInstruction>,
}

/// Sequences provisioning, tunnel launch and discovery
pub struct Orchestrator {
    settings: AgentSettings,
    runner: Arc<dyn PrivilegedRunner>,
    stage: Mutex<Stage>,
}

impl Orchestrator {
    pub fn new(settings: AgentSettings, runner: Arc<dyn PrivilegedRunner>) -> Self {
        Self {
            settings,
            runner,
            stage: Mutex::new(Stage::Validating),
        }
    }

    /// Current stage of the run
    pub fn stage(&self) -> Stage {
        self.stage.lock().map(|stage| *stage).unwrap_or(Stage::Failed)
    }

    /// Run every stage up to serving
    ///
    /// On error the orchestrator is left in [`Stage::Failed`].
    pub async fn expose(&self, raw: RawAccessInputs) -> Result<Exposure> {
        let result = self.run_stages(raw).await;
        if let Err(e) = &result {
            tracing::debug!("Stage {} failed: {:#}", self.stage(), e);
            self.enter(Stage::Failed);
        }
        result
    }

    async fn run_stages(&self, raw: RawAccessInputs) -> Result<Exposure> {
        self.enter(Stage::Validating);
        let config = AccessConfig::from_inputs(raw)
            .map_err(AccessError::from)
            .context("Issue with input")?;
        tracing::info!("Configuration:\n{}", config.summary());

        self.enter(Stage::Provisioning);
        let provisioner =
            CredentialProvisioner::new(&self.settings, Arc::clone(&self.runner), config.debug);
        if let Some(key) = &config.ssh_public_key {
            provisioner
                .grant_ssh_trust(key)
                .map_err(AccessError::from)
                .context("Failed to add authorized key")?;
        }
        if let Some(password) = &config.desktop_password {
            provisioner
                .set_desktop_access(password)
                .await
                .map_err(AccessError::from)
                .context("Failed to enable remote desktop")?;
        }

        let descriptor = TunnelDescriptor::build(
            &config.tunnel_auth_token,
            config.expose_ssh(),
            config.expose_vnc(),
        );
        tracing::info!("Creating tunnel config at {:?}", self.settings.descriptor_path);
        descriptor
            .write_to(&self.settings.descriptor_path)
            .map_err(AccessError::from)
            .context("Failed to create tunnel config")?;
        self.enter(Stage::DescriptorBuilt);

        self.enter(Stage::Launching);
        TunnelLauncher::new(&self.settings.tunnel_binary, config.debug)
            .launch(&self.settings.descriptor_path)
            .map_err(AccessError::from)
            .context("Failed to start tunnel")?;

        self.enter(Stage::Discovering);
        let retry = &self.settings.discovery;
        let api = HttpControlApi::new(&self.settings.control_api_url, retry.request_timeout)
            .context("Failed to create control API client")?;
        let discovery =
            TunnelDiscoveryClient::new(api, RetryPolicy::from_config(retry), config.debug);
        let tunnels = discovery
            .discover(&descriptor)
            .await
            .map_err(AccessError::from)
            .context("Failed to discover tunnels")?;

        let instructions = tunnels
            .iter()
            .map(|tunnel| AccessInstruction::for_tunnel(tunnel, &self.settings.desktop_user))
            .collect();

        self.enter(Stage::Serving);
        Ok(Exposure { instructions })
    }

    fn enter(&self, stage: Stage) {
        tracing::debug!("Entering stage: {}", stage);
        if let Ok(mut current) = self.stage.lock() {
            *current = stage;
        }
    }

    /// Keep the process alive on a fixed tick
    ///
    /// Never returns; the agent is stopped by killing the process.
    pub async fn serve(&self) {
        let period = self.settings.idle_tick.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            tracing::debug!("Tunnel still serving");
        }
    }
}
