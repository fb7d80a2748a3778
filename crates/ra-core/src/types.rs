//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of an exposed endpoint
///
/// The set is closed: only SSH and screen sharing are ever exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointName {
    Ssh,
    Vnc,
}

impl EndpointName {
    /// All endpoint names, in descriptor order
    pub const ALL: [EndpointName; 2] = [EndpointName::Ssh, EndpointName::Vnc];

    /// Well-known local port for this service
    pub fn local_port(self) -> u16 {
        match self {
            EndpointName::Ssh => 22,
            EndpointName::Vnc => 5900,
        }
    }

    /// Wire name used in the descriptor and by the control API
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointName::Ssh => "ssh",
            EndpointName::Vnc => "vnc",
        }
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssh" => Ok(EndpointName::Ssh),
            "vnc" => Ok(EndpointName::Vnc),
            other => Err(other.to_string()),
        }
    }
}

/// Transport used by the relay for an endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    #[default]
    Tcp,
}

/// A single port mapping handed to the tunnel process
///
/// Serializes as `{"addr": <port>, "proto": "tcp"}`; the name is the key
/// under which the mapping is stored in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelEndpointSpec {
    #[serde(skip)]
    pub name: EndpointName,
    #[serde(rename = "addr")]
    pub local_port: u16,
    pub proto: TransportProtocol,
}

impl TunnelEndpointSpec {
    /// Mapping for a named service on its well-known port
    pub fn well_known(name: EndpointName) -> Self {
        Self {
            name,
            local_port: name.local_port(),
            proto: TransportProtocol::Tcp,
        }
    }
}
