//! Console output for the operator
//!
//! Renders each discovered endpoint as an access instruction and provides
//! coloured status lines.

use std::fmt;

use ra_core::EndpointName;

use crate::tunnel::DiscoveredTunnel;

/// How an operator reaches one exposed service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessInstruction {
    pub service: EndpointName,
    pub host: String,
    pub port: u16,
    /// Command to run on the operator's machine
    pub command: String,
    /// What the operator needs besides the command
    pub reminder: String,
}

impl AccessInstruction {
    /// Render the instruction for a discovered tunnel
    pub fn for_tunnel(tunnel: &DiscoveredTunnel, user: &str) -> Self {
        let (command, reminder) = match tunnel.name {
            EndpointName::Ssh => (
                format!("ssh {}@{} -p {}", user, tunnel.host, tunnel.port),
                "Load the private key matching the configured public key first: ssh-add <private-key-file>"
                    .to_string(),
            ),
            EndpointName::Vnc => (
                format!("open vnc://{}@{}:{}", user, tunnel.host, tunnel.port),
                "Log in with the configured desktop password".to_string(),
            ),
        };

        Self {
            service: tunnel.name,
            host: tunnel.host.clone(),
            port: tunnel.port,
            command,
            reminder,
        }
    }
}

impl fmt::Display for AccessInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self.service {
            EndpointName::Ssh => "SSH",
            EndpointName::Vnc => "Screen Sharing",
        };
        writeln!(f, "{} ({}:{})", title, self.host, self.port)?;
        writeln!(f, "    $ {}", self.command)?;
        write!(f, "    {}", self.reminder)
    }
}

/// Format all instructions as one block separated by blank lines
pub fn format_instructions(instructions: &[AccessInstruction]) -> String {
    instructions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
