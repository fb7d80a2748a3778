//! Tunnel process launcher

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use ra_core::error::LaunchError;

/// Handle-free record of a spawned tunnel process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedTunnel {
    /// OS process id, if still known at spawn time
    pub pid: Option<u32>,
}

/// Starts the tunnel binary against a descriptor
///
/// The process is spawned and detached: nothing waits on it, signals it or
/// restarts it. A crash after launch only shows up as discovery failing.
#[derive(Debug, Clone)]
pub struct TunnelLauncher {
    binary: String,
    /// Keep the tunnel's own output on our console
    debug: bool,
}

impl TunnelLauncher {
    pub fn new(binary: impl Into<String>, debug: bool) -> Self {
        Self {
            binary: binary.into(),
            debug,
        }
    }

    /// Command line used to start all configured tunnels
    pub fn command_args(descriptor_path: &Path) -> Vec<String> {
        vec![
            "start".to_string(),
            "--all".to_string(),
            "--config".to_string(),
            descriptor_path.to_string_lossy().into_owned(),
        ]
    }

    /// Spawn the tunnel process and return without waiting for it
    pub fn launch(&self, descriptor_path: &Path) -> Result<LaunchedTunnel, LaunchError> {
        let args = Self::command_args(descriptor_path);
        tracing::info!("$ {} {}", self.binary, args.join(" "));

        let mut command = tokio::process::Command::new(&self.binary);
        command.args(&args).stdin(Stdio::null());
        if self.debug {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = command.spawn().map_err(|source| match source.kind() {
            ErrorKind::NotFound => LaunchError::NotFound(self.binary.clone()),
            _ => LaunchError::Spawn {
                binary: self.binary.clone(),
                source,
            },
        })?;

        let launched = LaunchedTunnel { pid: child.id() };
        tracing::debug!("Tunnel process spawned (pid {:?})", launched.pid);

        // Dropping the handle leaves the process running; tokio reaps it on exit.
        drop(child);
        Ok(launched)
    }
}
