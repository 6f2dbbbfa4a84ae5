//! Language server discovery.
//!
//! The Antigravity language server is found in the process table; its
//! command line carries the CSRF token and, usually, the port. When the
//! port is missing it is read from `lsof`.

use tallybar_fetch::ProcessRunner;
use tracing::{debug, instrument};

use super::error::AntigravityError;

const PROCESS_MARKER: &str = "language_server";
const CSRF_FLAG: &str = "--csrf_token";
const PORT_FLAG: &str = "--extension_server_port";

/// A running language server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageServer {
    /// Process id.
    pub pid: u32,
    /// Token the server expects in `X-Codeium-Csrf-Token`.
    pub csrf_token: String,
    /// Port from the command line, if given.
    pub port: Option<u16>,
}

// ============================================================================
// Parsing
// ============================================================================

fn is_antigravity_command(lower: &str) -> bool {
    (lower.contains("--app_data_dir") && lower.contains("antigravity"))
        || lower.contains("/antigravity/")
}

/// Reads `--flag=value` or `--flag value` from a command line.
fn extract_flag(flag: &str, command: &str) -> Option<String> {
    let mut tokens = command.split_whitespace();
    while let Some(token) = tokens.next() {
        if let Some(value) = token.strip_prefix(flag) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value.to_string()).filter(|v| !v.is_empty());
            }
            if value.is_empty() {
                return tokens.next().map(str::to_string);
            }
        }
    }
    None
}

/// Finds the language server in `ps -ax -o pid=,command=` output.
pub fn find_language_server(ps_output: &str) -> Option<LanguageServer> {
    ps_output.lines().find_map(|line| {
        let (pid, command) = line.trim().split_once(char::is_whitespace)?;
        let pid = pid.parse().ok()?;
        let lower = command.to_lowercase();
        if !lower.contains(PROCESS_MARKER) || !is_antigravity_command(&lower) {
            return None;
        }

        let csrf_token = extract_flag(CSRF_FLAG, command)?;
        let port = extract_flag(PORT_FLAG, command).and_then(|p| p.parse().ok());
        Some(LanguageServer {
            pid,
            csrf_token,
            port,
        })
    })
}

/// Reads listening TCP ports from `lsof -nP -iTCP -sTCP:LISTEN` output,
/// sorted and deduplicated.
pub fn parse_listening_ports(lsof_output: &str) -> Vec<u16> {
    let mut ports: Vec<u16> = lsof_output
        .lines()
        .filter_map(|line| {
            let before = &line[..line.find("(LISTEN)")?];
            let colon = before.rfind(':')?;
            before[colon + 1..].trim().parse().ok()
        })
        .collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}

// ============================================================================
// Discovery
// ============================================================================

/// Looks for a running language server.
#[instrument(skip(runner))]
pub async fn detect(runner: &ProcessRunner) -> Result<LanguageServer, AntigravityError> {
    let output = runner.run("ps", &["-ax", "-o", "pid=,command="]).await?;
    let server = find_language_server(&output.stdout).ok_or(AntigravityError::NotRunning)?;
    debug!(pid = server.pid, port = ?server.port, "Found language server");
    Ok(server)
}

/// Ports to try for a server: the advertised one, else whatever it listens on.
#[instrument(skip(runner, server), fields(pid = server.pid))]
pub async fn candidate_ports(
    runner: &ProcessRunner,
    server: &LanguageServer,
) -> Result<Vec<u16>, AntigravityError> {
    if let Some(port) = server.port {
        return Ok(vec![port]);
    }

    if !runner.command_exists("lsof") {
        return Err(AntigravityError::PortDetectionFailed("lsof not available".to_string()));
    }

    let pid = server.pid.to_string();
    let output = runner
        .run("lsof", &["-nP", "-iTCP", "-sTCP:LISTEN", "-a", "-p", &pid])
        .await?;
    let ports = parse_listening_ports(&output.stdout);
    if ports.is_empty() {
        return Err(AntigravityError::PortDetectionFailed(
            "no listening ports found".to_string(),
        ));
    }
    Ok(ports)
}
