//! Credential provisioning on the host
//!
//! Two independent steps, each driven by which secret was configured:
//! trusting an SSH public key, and setting the desktop password followed by
//! activating screen sharing with that same password.

mod authorized_keys;
mod command;

pub use authorized_keys::append_authorized_key;
pub use command::{PrivilegedCommand, PrivilegedRunner, SudoRunner};

use std::path::PathBuf;
use std::sync::Arc;

use ra_core::config::AgentSettings;
use ra_core::error::CredentialError;

/// Applies credential changes to the host
pub struct CredentialProvisioner {
    authorized_keys_path: PathBuf,
    desktop_user: String,
    kickstart_path: PathBuf,
    runner: Arc<dyn PrivilegedRunner>,
    /// Print secrets in command lines
    debug: bool,
}

impl CredentialProvisioner {
    /// Create a provisioner from agent settings
    pub fn new(settings: &AgentSettings, runner: Arc<dyn PrivilegedRunner>, debug: bool) -> Self {
        Self {
            authorized_keys_path: settings.authorized_keys_path.clone(),
            desktop_user: settings.desktop_user.clone(),
            kickstart_path: settings.kickstart_path.clone(),
            runner,
            debug,
        }
    }

    /// Trust a public key for SSH logins as the current user
    pub fn grant_ssh_trust(&self, key: &str) -> Result<(), CredentialError> {
        tracing::info!("Adding authorized key to {:?}", self.authorized_keys_path);
        append_authorized_key(&self.authorized_keys_path, key)
    }

    /// Set the desktop user's password, then enable screen sharing with it
    ///
    /// The password change must come first: activation embeds the password
    /// as the screen sharing secret.
    pub async fn set_desktop_access(&self, password: &str) -> Result<(), CredentialError> {
        for command in [self.password_command(password), self.kickstart_command(password)] {
            tracing::info!("$ sudo {}", command.printable(self.debug));
            self.runner.run(&command).await?;
        }
        Ok(())
    }

    fn password_command(&self, password: &str) -> PrivilegedCommand {
        let user_record = format!("/Users/{}", self.desktop_user);
        PrivilegedCommand::new("dscl", [".", "-passwd", user_record.as_str(), password])
            .with_secret(password)
    }

    fn kickstart_command(&self, password: &str) -> PrivilegedCommand {
        PrivilegedCommand::new(
            self.kickstart_path.to_string_lossy(),
            [
                "-activate",
                "-configure",
                "-access",
                "-on",
                "-clientopts",
                "-setvnclegacy",
                "-vnclegacy",
                "yes",
                "-clientopts",
                "-setvncpw",
                "-vncpw",
                password,
                "-restart",
                "-agent",
                "-privs",
                "-all",
            ],
        )
        .with_secret(password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records commands and fails the one whose program matches `fail_on`
    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<PrivilegedCommand>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl PrivilegedRunner for RecordingRunner {
        async fn run(&self, command: &PrivilegedCommand) -> Result<(), CredentialError> {
            self.commands.lock().unwrap().push(command.clone());
            if self.fail_on.as_deref() == Some(command.program.as_str()) {
                return Err(CredentialError::CommandFailed {
                    command: command.printable(false),
                    status: "exit status: 1".to_string(),
                    stderr: "permission denied".to_string(),
                });
            }
            Ok(())
        }
    }

    fn settings() -> AgentSettings {
        AgentSettings {
            desktop_user: "runner".to_string(),
            kickstart_path: PathBuf::from("/usr/bin/kickstart"),
            ..AgentSettings::default()
        }
    }

    #[tokio::test]
    async fn test_password_set_before_activation() {
        let runner = Arc::new(RecordingRunner::default());
        let provisioner = CredentialProvisioner::new(&settings(), runner.clone(), false);

        provisioner.set_desktop_access("hunter2").await.unwrap();

        let commands = runner.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].program, "dscl");
        assert_eq!(commands[0].args, vec![".", "-passwd", "/Users/runner", "hunter2"]);
        assert_eq!(commands[1].program, "/usr/bin/kickstart");
        assert!(commands[1]
            .args
            .windows(2)
            .any(|pair| pair == ["-vncpw", "hunter2"]));
        assert!(commands[1].args.windows(2).any(|pair| pair == ["-privs", "-all"]));
    }

    #[tokio::test]
    async fn test_activation_skipped_when_password_change_fails() {
        let runner = Arc::new(RecordingRunner {
            fail_on: Some("dscl".to_string()),
            ..RecordingRunner::default()
        });
        let provisioner = CredentialProvisioner::new(&settings(), runner.clone(), false);

        let err = provisioner.set_desktop_access("hunter2").await.unwrap_err();

        assert!(matches!(err, CredentialError::CommandFailed { .. }));
        assert!(!err.to_string().contains("hunter2"));
        assert_eq!(runner.commands.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_grant_ssh_trust_writes_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AgentSettings {
            authorized_keys_path: dir.path().join("authorized_keys"),
            ..settings()
        };
        let provisioner =
            CredentialProvisioner::new(&settings, Arc::new(RecordingRunner::default()), false);

        provisioner.grant_ssh_trust("ssh-ed25519 AAAA").unwrap();

        let content = std::fs::read_to_string(dir.path().join("authorized_keys")).unwrap();
        assert_eq!(content, "\nssh-ed25519 AAAA\n");
    }
}
