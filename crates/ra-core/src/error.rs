//! Core error types for remote-access

use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error carried across crate boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type, one variant per failure class
///
/// Messages name the class only; the cause is available as the error source.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Bad or missing input
    #[error("Configuration error")]
    Config(#[from] ConfigError),

    /// OS-level provisioning failure
    #[error("Credential error")]
    Credential(#[from] CredentialError),

    /// Descriptor could not be written
    #[error("Descriptor error")]
    Descriptor(#[from] DescriptorError),

    /// Tunnel process could not be started
    #[error("Launch error")]
    Launch(#[from] LaunchError),

    /// Tunnel endpoints never became known
    #[error("Discovery error")]
    Discovery(#[from] DiscoveryError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// None of the credential inputs were provided
    #[error("Neither {ssh_key} nor {password} specified. At least one is required")]
    NoCredentials {
        ssh_key: &'static str,
        password: &'static str,
    },

    /// Settings file not found
    #[error("Settings file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error")]
    Parse(#[from] toml::de::Error),
}

/// Credential provisioning errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Authorized keys file could not be opened or written
    #[error("Can't write authorized keys file {path:?}")]
    AuthorizedKeys {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Privileged command could not be started
    #[error("Failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Privileged command exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Tunnel descriptor persistence errors
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Descriptor could not be serialized
    #[error("Failed to serialize descriptor")]
    Serialize(#[from] serde_json::Error),

    /// Descriptor file could not be written
    #[error("Failed to write descriptor {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tunnel process launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Tunnel executable not found
    #[error("Tunnel binary not found: {0}")]
    NotFound(String),

    /// Tunnel process could not be spawned
    #[error("Failed to spawn {binary}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tunnel discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Control API never answered within the retry bound
    #[error("Control API unreachable after {attempts} attempts")]
    Unreachable {
        attempts: u32,
        #[source]
        source: BoxError,
    },

    /// Control API reported a tunnel the descriptor never declared
    #[error("Unknown tunnel reported by control API: {0}")]
    UnknownTunnel(String),

    /// Some declared tunnels never came up
    #[error("Tunnels not established after {attempts} attempts: {}", .missing.join(", "))]
    Incomplete { attempts: u32, missing: Vec<String> },

    /// Public URL could not be interpreted as host and port
    #[error("Invalid public URL for {name} ({url}): {reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },
}
