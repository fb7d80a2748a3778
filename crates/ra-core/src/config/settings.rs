//! Agent settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;

/// Default location of the macOS remote management utility
const KICKSTART_PATH: &str =
    "/System/Library/CoreServices/RemoteManagement/ARDAgent.app/Contents/Resources/kickstart";

/// Non-secret tunables for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Tunnel executable, looked up on `PATH` unless absolute
    pub tunnel_binary: String,

    /// Where the tunnel descriptor is written
    pub descriptor_path: PathBuf,

    /// SSH authorized keys file of the current user
    pub authorized_keys_path: PathBuf,

    /// Tunnel process control API listing active tunnels
    pub control_api_url: String,

    /// Remote management activation utility
    pub kickstart_path: PathBuf,

    /// Interactive user whose password is changed
    pub desktop_user: String,

    /// How often the agent logs while keeping the tunnel alive
    #[serde(with = "duration_secs")]
    pub idle_tick: Duration,

    /// Retry policy for tunnel discovery
    pub discovery: RetryConfig,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tunnel_binary: "ngrok".to_string(),
            descriptor_path: PathBuf::from("/tmp/ngrok-config.yml"),
            authorized_keys_path: dirs::home_dir()
                .unwrap_or_default()
                .join(".ssh")
                .join("authorized_keys"),
            control_api_url: "http://127.0.0.1:4040/api/tunnels".to_string(),
            kickstart_path: PathBuf::from(KICKSTART_PATH),
            desktop_user: whoami::username(),
            idle_tick: Duration::from_secs(10),
            discovery: RetryConfig::default(),
        }
    }
}

impl AgentSettings {
    /// Load settings from a TOML file and validate them
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings: Self = super::load_config(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the agent cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tunnel_binary.trim().is_empty() {
            return Err(ConfigError::Invalid("tunnel_binary is empty".to_string()));
        }
        self.discovery.validate()
    }
}

/// Longest delay accepted between discovery attempts
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Bounded retry configuration
///
/// A multiplier of 1.0 gives a fixed delay between attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(with = "duration_secs")]
    pub delay: Duration,

    /// Multiplier applied to the delay after each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,

    /// Timeout for a single request
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            multiplier: 1.0,
            jitter: 0.0,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Check that the delay schedule is finite and bounded
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "discovery.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "discovery.multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid(format!(
                "discovery.jitter must be between 0.0 and 1.0, got {}",
                self.jitter
            )));
        }
        if self.delay > MAX_RETRY_DELAY {
            return Err(ConfigError::Invalid(format!(
                "discovery.delay must not exceed {}s",
                MAX_RETRY_DELAY.as_secs()
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "discovery.request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
