//! ra-agent: remote access provisioning agent
//!
//! The agent runs on the host to be reached. It installs temporary
//! credentials, starts a tunnel process exposing SSH and screen sharing,
//! discovers the public endpoints and prints how to reach them.

pub mod orchestrator;
pub mod output;
pub mod provision;
pub mod tunnel;

pub use orchestrator::{Exposure, Orchestrator, Stage};
pub use output::AccessInstruction;
pub use provision::{CredentialProvisioner, PrivilegedCommand, PrivilegedRunner, SudoRunner};
pub use tunnel::{
    ControlApi, DiscoveredTunnel, HttpControlApi, RetryPolicy, TunnelDiscoveryClient,
    TunnelLauncher,
};
