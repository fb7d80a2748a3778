//! Configuration management for remote-access
//!
//! Secrets arrive through the environment (see [`env`]) and are validated into
//! an [`AccessConfig`]. Non-secret tunables live in [`AgentSettings`], which
//! can optionally be loaded from a TOML file.

mod access;
pub mod serde_utils;
mod settings;

pub use access::{AccessConfig, RawAccessInputs};
pub use settings::{AgentSettings, RetryConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Environment variable names for the access inputs
pub mod env {
    pub const SSH_PUBLIC_KEY: &str = "ssh_public_key";
    pub const DESKTOP_PASSWORD: &str = "user_and_screen_share_password";
    pub const TUNNEL_AUTH_TOKEN: &str = "ngrok_auth_token";
    pub const DEBUG_MODE: &str = "is_step_debug_mode";
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("remote-access")
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("agent.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}
