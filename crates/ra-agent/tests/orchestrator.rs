//! End-to-end orchestrator tests
//!
//! Privileged commands are recorded instead of run, the tunnel binary is
//! replaced by `true`, and the control API is served by a local axum app.

#![cfg(unix)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use ra_agent::{Orchestrator, PrivilegedCommand, PrivilegedRunner, Stage};
use ra_core::config::{AgentSettings, RawAccessInputs, RetryConfig};
use ra_core::error::{AccessError, CredentialError, DiscoveryError};

const SSH_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHGg operator@example.com";

#[derive(Default)]
struct RecordingRunner {
    commands: Mutex<Vec<PrivilegedCommand>>,
}

impl RecordingRunner {
    fn programs(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }
}

#[async_trait]
impl PrivilegedRunner for RecordingRunner {
    async fn run(&self, command: &PrivilegedCommand) -> Result<(), CredentialError> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Serve the control API; the first `failures` requests get a 503
async fn serve_control_api(body: serde_json::Value, failures: u32) -> (String, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);

    let app = Router::new().route(
        "/api/tunnels",
        get(move || {
            let body = body.clone();
            let counter = Arc::clone(&counter);
            async move {
                let hit = counter.fetch_add(1, Ordering::SeqCst);
                if hit < failures {
                    StatusCode::SERVICE_UNAVAILABLE.into_response()
                } else {
                    Json(body).into_response()
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/tunnels", addr), hits)
}

fn settings(dir: &Path, control_api_url: String) -> AgentSettings {
    AgentSettings {
        tunnel_binary: "true".to_string(),
        descriptor_path: dir.join("ngrok-config.yml"),
        authorized_keys_path: dir.join(".ssh").join("authorized_keys"),
        control_api_url,
        desktop_user: "user".to_string(),
        discovery: RetryConfig {
            delay: Duration::ZERO,
            request_timeout: Duration::from_secs(2),
            ..RetryConfig::default()
        },
        ..AgentSettings::default()
    }
}

fn inputs(key: &str, password: &str, token: &str) -> RawAccessInputs {
    RawAccessInputs {
        ssh_public_key: Some(key.to_string()),
        desktop_password: Some(password.to_string()),
        tunnel_auth_token: Some(token.to_string()),
        debug: false,
    }
}

fn read_descriptor(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_ssh_only_run() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _) = serve_control_api(
        json!({"tunnels": [{"name": "ssh", "public_url": "tcp://0.tcp.example.com:12345"}]}),
        0,
    )
    .await;
    let settings = settings(dir.path(), url);
    std::fs::create_dir_all(dir.path().join(".ssh")).unwrap();
    std::fs::write(&settings.authorized_keys_path, "ssh-rsa AAAAexisting\n").unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let orchestrator = Orchestrator::new(settings.clone(), runner.clone());
    let exposure = orchestrator.expose(inputs(SSH_KEY, "", "tok123")).await.unwrap();

    // One key appended after the existing entry
    let keys = std::fs::read_to_string(&settings.authorized_keys_path).unwrap();
    assert_eq!(keys, format!("ssh-rsa AAAAexisting\n\n{}\n", SSH_KEY));

    let descriptor = read_descriptor(&settings.descriptor_path);
    assert_eq!(
        descriptor,
        json!({"authtoken": "tok123", "tunnels": {"ssh": {"addr": 22, "proto": "tcp"}}})
    );

    assert!(runner.programs().is_empty());
    assert_eq!(orchestrator.stage(), Stage::Serving);

    assert_eq!(exposure.instructions.len(), 1);
    assert_eq!(
        exposure.instructions[0].command,
        "ssh user@0.tcp.example.com -p 12345"
    );
}

#[tokio::test]
async fn test_desktop_only_run() {
    let dir = tempfile::tempdir().unwrap();
    let (url, _) = serve_control_api(
        json!({"tunnels": [{"name": "vnc", "public_url": "tcp://0.tcp.example.com:41234"}]}),
        0,
    )
    .await;
    let settings = settings(dir.path(), url);

    let runner = Arc::new(RecordingRunner::default());
    let orchestrator = Orchestrator::new(settings.clone(), runner.clone());
    let exposure = orchestrator.expose(inputs("", "hunter2", "tok123")).await.unwrap();

    assert!(!settings.authorized_keys_path.exists());
    assert_eq!(
        runner.programs(),
        vec![
            "dscl".to_string(),
            settings.kickstart_path.to_string_lossy().into_owned()
        ]
    );

    let descriptor = read_descriptor(&settings.descriptor_path);
    assert!(descriptor["tunnels"].get("ssh").is_none());
    assert_eq!(descriptor["tunnels"]["vnc"]["addr"], 5900);

    assert_eq!(
        exposure.instructions[0].command,
        "open vnc://user@0.tcp.example.com:41234"
    );
}

#[tokio::test]
async fn test_discovery_retries_until_api_ready() {
    let dir = tempfile::tempdir().unwrap();
    let (url, hits) = serve_control_api(
        json!({"tunnels": [
            {"name": "vnc", "public_url": "tcp://1.tcp.example.com:2"},
            {"name": "ssh", "public_url": "tcp://1.tcp.example.com:1"}
        ]}),
        1,
    )
    .await;

    let orchestrator = Orchestrator::new(
        settings(dir.path(), url),
        Arc::new(RecordingRunner::default()),
    );
    let exposure = orchestrator.expose(inputs(SSH_KEY, "pw", "tok")).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    let commands: Vec<_> = exposure.instructions.iter().map(|i| i.command.as_str()).collect();
    assert_eq!(
        commands,
        vec!["ssh user@1.tcp.example.com -p 1", "open vnc://user@1.tcp.example.com:2"]
    );
}

#[tokio::test]
async fn test_unreachable_control_api() {
    let dir = tempfile::tempdir().unwrap();
    // Reserve a port, then close it so nothing listens there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api/tunnels", listener.local_addr().unwrap());
    drop(listener);

    let orchestrator = Orchestrator::new(
        settings(dir.path(), url),
        Arc::new(RecordingRunner::default()),
    );
    let err = orchestrator
        .expose(inputs(SSH_KEY, "", "tok"))
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).starts_with("Failed to discover tunnels"));
    assert!(matches!(
        err.downcast_ref::<AccessError>(),
        Some(AccessError::Discovery(DiscoveryError::Unreachable { attempts: 3, .. }))
    ));
}

#[tokio::test]
async fn test_unknown_tunnel_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (url, hits) = serve_control_api(
        json!({"tunnels": [
            {"name": "ssh", "public_url": "tcp://0.tcp.example.com:1"},
            {"name": "web", "public_url": "https://abc.example.com"}
        ]}),
        0,
    )
    .await;

    let orchestrator = Orchestrator::new(
        settings(dir.path(), url),
        Arc::new(RecordingRunner::default()),
    );
    let err = orchestrator
        .expose(inputs(SSH_KEY, "", "tok"))
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(format!("{:#}", err).contains("Unknown tunnel reported by control API: web"));
}

#[tokio::test]
async fn test_invalid_input_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "http://127.0.0.1:1/api/tunnels".to_string());

    let runner = Arc::new(RecordingRunner::default());
    let orchestrator = Orchestrator::new(settings.clone(), runner.clone());
    let err = orchestrator
        .expose(inputs(SSH_KEY, "pw", ""))
        .await
        .unwrap_err();

    assert_eq!(
        format!("{:#}", err),
        "Issue with input: Configuration error: Missing required field: ngrok_auth_token"
    );
    assert!(!settings.authorized_keys_path.exists());
    assert!(!settings.descriptor_path.exists());
    assert!(runner.programs().is_empty());
    assert_eq!(orchestrator.stage(), Stage::Failed);
}

#[tokio::test]
async fn test_missing_tunnel_binary() {
    let dir = tempfile::tempdir().unwrap();
    let settings = AgentSettings {
        tunnel_binary: "ra-agent-no-such-tunnel-binary".to_string(),
        ..settings(dir.path(), "http://127.0.0.1:1/api/tunnels".to_string())
    };

    let orchestrator = Orchestrator::new(settings.clone(), Arc::new(RecordingRunner::default()));
    let err = orchestrator
        .expose(inputs(SSH_KEY, "", "tok"))
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).starts_with("Failed to start tunnel"));
    assert_eq!(orchestrator.stage(), Stage::Failed);
    // Earlier stages already ran and are not rolled back
    assert!(settings.authorized_keys_path.exists());
    assert!(settings.descriptor_path.exists());
}
