//! Tunnel process launch and endpoint discovery

mod discovery;
mod launcher;
mod retry;

pub use discovery::{
    ApiTunnel, ControlApi, DiscoveredTunnel, HttpControlApi, TunnelDiscoveryClient, TunnelList,
};
pub use launcher::{LaunchedTunnel, TunnelLauncher};
pub use retry::RetryPolicy;
