//! Tunnel descriptor generation
//!
//! The descriptor tells the tunnel process which local ports to expose and
//! under which names. It is written once per run and never touched again.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::DescriptorError;
use crate::types::{EndpointName, TunnelEndpointSpec};

/// Declarative tunnel configuration consumed by the tunnel process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelDescriptor {
    /// Relay account token
    pub authtoken: String,
    /// Named port mappings
    pub tunnels: BTreeMap<EndpointName, TunnelEndpointSpec>,
}

impl TunnelDescriptor {
    /// Build a descriptor exposing exactly the requested services
    pub fn build(auth_token: &str, expose_ssh: bool, expose_vnc: bool) -> Self {
        let tunnels = EndpointName::ALL
            .into_iter()
            .filter(|name| match name {
                EndpointName::Ssh => expose_ssh,
                EndpointName::Vnc => expose_vnc,
            })
            .map(|name| (name, TunnelEndpointSpec::well_known(name)))
            .collect();

        Self {
            authtoken: auth_token.to_string(),
            tunnels,
        }
    }

    /// Check whether the descriptor declares a tunnel with this name
    pub fn declares(&self, name: &str) -> bool {
        name.parse::<EndpointName>()
            .map(|name| self.tunnels.contains_key(&name))
            .unwrap_or(false)
    }

    /// Declared endpoint names in descriptor order
    pub fn endpoint_names(&self) -> impl Iterator<Item = EndpointName> + '_ {
        self.tunnels.keys().copied()
    }

    /// Render the descriptor as pretty JSON (also valid YAML)
    pub fn to_json(&self) -> Result<String, DescriptorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Persist the descriptor, replacing any previous file
    ///
    /// The file carries the relay token, so it is created owner-only on Unix.
    pub fn write_to(&self, path: &Path) -> Result<(), DescriptorError> {
        let content = self.to_json()?;
        let write_err = |source| DescriptorError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        file.write_all(b"\n").map_err(write_err)?;

        tracing::debug!(
            "Wrote tunnel descriptor with {} tunnel(s) to {:?}",
            self.tunnels.len(),
            path
        );
        Ok(())
    }
}
