//! remote-access agent
//!
//! Grants temporary SSH and screen sharing access to this host, exposes both
//! services through an ngrok tunnel and prints how to reach them.
//!
//! Inputs come from the environment (or the equivalent flags):
//!
//! ```text
//! ssh_public_key                  public key to trust for SSH
//! user_and_screen_share_password  desktop and screen sharing password
//! ngrok_auth_token                relay auth token (required)
//! is_step_debug_mode              "true" for verbose output with secrets
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ra_agent::output::{format_instructions, print_error, print_info, print_success};
use ra_agent::{Orchestrator, SudoRunner};
use ra_core::config::{self, env, AgentSettings, RawAccessInputs};

#[derive(Parser)]
#[command(name = "ra-agent")]
#[command(about = "Provision temporary remote access and expose SSH/VNC through a tunnel")]
#[command(version)]
struct Args {
    /// Public key to trust for SSH logins
    #[arg(long, env = env::SSH_PUBLIC_KEY)]
    ssh_public_key: Option<String>,

    /// Password for the desktop user and screen sharing
    #[arg(long, env = env::DESKTOP_PASSWORD, hide_env_values = true)]
    desktop_password: Option<String>,

    /// Tunnel relay auth token
    #[arg(long, env = env::TUNNEL_AUTH_TOKEN, hide_env_values = true)]
    tunnel_auth_token: Option<String>,

    /// Verbose output, secrets included (only the value "true" enables it)
    #[arg(long, env = env::DEBUG_MODE, value_parser = parse_debug_mode)]
    debug: bool,

    /// Path to the settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(e) = run(args).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;

    let raw = RawAccessInputs {
        ssh_public_key: args.ssh_public_key,
        desktop_password: args.desktop_password,
        tunnel_auth_token: args.tunnel_auth_token,
        debug: args.debug,
    };

    let orchestrator = Orchestrator::new(settings, Arc::new(SudoRunner::default()));
    let exposure = orchestrator.expose(raw).await?;

    print_success("Success");
    print_info("Remote access is ready:");
    println!("\n{}\n", format_instructions(&exposure.instructions));

    orchestrator.serve().await;
    Ok(())
}

/// Load settings from an explicit path, the default path, or defaults
fn load_settings(path: Option<&std::path::Path>) -> Result<AgentSettings> {
    if let Some(path) = path {
        return Ok(AgentSettings::load(path)?);
    }

    let default_path = config::default_settings_path();
    if !default_path.exists() {
        return Ok(AgentSettings::default());
    }

    Ok(AgentSettings::load(&default_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings from {:?}: {}", default_path, e);
        AgentSettings::default()
    }))
}

/// Debug mode is on only for the exact value `true`
fn parse_debug_mode(value: &str) -> Result<bool, std::convert::Infallible> {
    Ok(value == "true")
}
