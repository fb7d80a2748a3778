//! Privileged command execution

use std::process::Stdio;

use async_trait::async_trait;
use ra_core::error::CredentialError;

/// A command that must run with elevated privileges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedCommand {
    /// Program to run
    pub program: String,
    /// Arguments, secrets included
    pub args: Vec<String>,
    /// Argument value masked when the command is printed
    secret: Option<String>,
}

impl PrivilegedCommand {
    /// Create a command with no secret arguments
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            secret: None,
        }
    }

    /// Mark an argument value as secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Command line for logs and error messages
    ///
    /// The secret argument is replaced by `***` unless `reveal` is set.
    pub fn printable(&self, reveal: bool) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|arg| match &self.secret {
            Some(secret) if !reveal && arg == secret => "***".to_string(),
            _ => arg.clone(),
        }));
        parts.join(" ")
    }
}

/// Runs privileged commands on the host
#[async_trait]
pub trait PrivilegedRunner: Send + Sync {
    /// Run the command to completion, failing on a non-zero exit
    async fn run(&self, command: &PrivilegedCommand) -> Result<(), CredentialError>;
}

/// Runs commands through an elevation prefix, `sudo -n` by default
#[derive(Debug, Clone)]
pub struct SudoRunner {
    program: String,
    args: Vec<String>,
}

impl Default for SudoRunner {
    fn default() -> Self {
        Self::with_prefix("sudo", ["-n"])
    }
}

impl SudoRunner {
    /// Run commands as `<program> <args..> <command>`
    pub fn with_prefix<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn prefix(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl PrivilegedRunner for SudoRunner {
    async fn run(&self, command: &PrivilegedCommand) -> Result<(), CredentialError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CredentialError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CredentialError::CommandFailed {
                command: format!("{} {}", self.prefix(), command.printable(false)),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
