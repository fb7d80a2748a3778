//! ra-core: Core types and configuration for remote-access
//!
//! This crate provides the configuration model, the error taxonomy and the
//! tunnel descriptor shared by the agent binary and its tests.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod types;

pub use descriptor::TunnelDescriptor;
pub use error::AccessError;
pub use types::{EndpointName, TransportProtocol, TunnelEndpointSpec};
