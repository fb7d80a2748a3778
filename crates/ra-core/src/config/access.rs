//! Access configuration and validation

use std::fmt;

use super::env;
use crate::error::ConfigError;

/// Raw inputs as read from the environment or command line
#[derive(Debug, Clone, Default)]
pub struct RawAccessInputs {
    pub ssh_public_key: Option<String>,
    pub desktop_password: Option<String>,
    pub tunnel_auth_token: Option<String>,
    pub debug: bool,
}

/// Validated access configuration
///
/// Optional secrets are `None` when absent or blank, so `Some` always holds a
/// non-empty value. The password is kept verbatim; other values are trimmed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessConfig {
    pub ssh_public_key: Option<String>,
    pub desktop_password: Option<String>,
    pub tunnel_auth_token: String,
    pub debug: bool,
}

/// One validation rule, evaluated in declaration order
enum Check<'a> {
    Required(&'static str, &'a str),
    AnyOf([(&'static str, bool); 2]),
}

impl AccessConfig {
    /// Normalize and validate raw inputs
    ///
    /// Checks run in a fixed order and the first failure is reported.
    pub fn from_inputs(raw: RawAccessInputs) -> Result<Self, ConfigError> {
        let ssh_public_key = non_blank(raw.ssh_public_key);
        let desktop_password = raw.desktop_password.filter(|v| !v.trim().is_empty());
        let tunnel_auth_token = non_blank(raw.tunnel_auth_token).unwrap_or_default();

        let checks = [
            Check::Required(env::TUNNEL_AUTH_TOKEN, &tunnel_auth_token),
            Check::AnyOf([
                (env::SSH_PUBLIC_KEY, ssh_public_key.is_some()),
                (env::DESKTOP_PASSWORD, desktop_password.is_some()),
            ]),
        ];

        for check in checks {
            match check {
                Check::Required(field, value) if value.is_empty() => {
                    return Err(ConfigError::MissingField(field.to_string()));
                }
                Check::AnyOf([(ssh_key, has_key), (password, has_password)])
                    if !has_key && !has_password =>
                {
                    return Err(ConfigError::NoCredentials { ssh_key, password });
                }
                _ => {}
            }
        }

        Ok(Self {
            ssh_public_key,
            desktop_password,
            tunnel_auth_token,
            debug: raw.debug,
        })
    }

    /// Whether the SSH endpoint should be exposed
    pub fn expose_ssh(&self) -> bool {
        self.ssh_public_key.is_some()
    }

    /// Whether the screen sharing endpoint should be exposed
    pub fn expose_vnc(&self) -> bool {
        self.desktop_password.is_some()
    }

    /// Multi-line summary for the console, secrets masked unless debugging
    pub fn summary(&self) -> String {
        let secret = |value: Option<&str>| match value {
            None => "-".to_string(),
            Some(v) if self.debug => v.to_string(),
            Some(_) => "***".to_string(),
        };

        format!(
            "- Debug: {}\n- SSH public key: {}\n- Desktop password: {}\n- Tunnel auth token: {}",
            self.debug,
            self.ssh_public_key.as_deref().unwrap_or("-"),
            secret(self.desktop_password.as_deref()),
            secret(Some(self.tunnel_auth_token.as_str())),
        )
    }
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("AccessConfig")
            .field("ssh_public_key", &self.ssh_public_key)
            .field("desktop_password", &mask(&self.desktop_password))
            .field("tunnel_auth_token", &"***")
            .field("debug", &self.debug)
            .finish()
    }
}

/// Trim a value and treat blank strings as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(key: &str, password: &str, token: &str) -> RawAccessInputs {
        RawAccessInputs {
            ssh_public_key: Some(key.to_string()),
            desktop_password: Some(password.to_string()),
            tunnel_auth_token: Some(token.to_string()),
            debug: false,
        }
    }

    #[test]
    fn test_missing_token_fails_first() {
        for raw in [
            inputs("ssh-ed25519 AAAA", "secret", ""),
            inputs("", "", ""),
            inputs("ssh-ed25519 AAAA", "", "   "),
            RawAccessInputs::default(),
        ] {
            let err = AccessConfig::from_inputs(raw).unwrap_err();
            assert!(
                matches!(&err, ConfigError::MissingField(f) if f == env::TUNNEL_AUTH_TOKEN),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn test_no_credentials() {
        let err = AccessConfig::from_inputs(inputs("", " ", "tok123")).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn test_ssh_only() {
        let config =
            AccessConfig::from_inputs(inputs(" ssh-ed25519 AAAA\n", "", "tok123")).unwrap();

        assert_eq!(config.ssh_public_key.as_deref(), Some("ssh-ed25519 AAAA"));
        assert_eq!(config.desktop_password, None);
        assert!(config.expose_ssh());
        assert!(!config.expose_vnc());
    }

    #[test]
    fn test_both_credentials() {
        let config = AccessConfig::from_inputs(inputs("ssh-rsa AAAA", "pw", "tok123")).unwrap();
        assert!(config.expose_ssh());
        assert!(config.expose_vnc());
        assert_eq!(config.tunnel_auth_token, "tok123");
    }

    #[test]
    fn test_summary_masks_secrets() {
        let config =
            AccessConfig::from_inputs(inputs("ssh-rsa AAAA", "hunter2", "tok123")).unwrap();
        let summary = config.summary();

        assert!(summary.contains("ssh-rsa AAAA"));
        assert!(!summary.contains("hunter2"));
        assert!(!summary.contains("tok123"));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_summary_reveals_secrets_in_debug() {
        let mut raw = inputs("", "hunter2", "tok123");
        raw.debug = true;
        let summary = AccessConfig::from_inputs(raw).unwrap().summary();

        assert!(summary.contains("hunter2"));
        assert!(summary.contains("tok123"));
        assert!(summary.contains("- SSH public key: -"));
    }
}
