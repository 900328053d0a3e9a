//! Process-backed executor
//!
//! Runs probes by spawning a configured command prefix such as
//! `docker exec {host}` with the probe's arguments appended.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CommandExecutor, DiagnosticDump};
use crate::common::config::HOST_PLACEHOLDER;
use crate::common::{Error, Result};

/// Executes commands through an external program
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    prefix: Vec<String>,
}

impl ProcessExecutor {
    pub fn new(prefix: Vec<String>) -> Result<Self> {
        if prefix.is_empty() {
            return Err(Error::Config("executor command must not be empty".to_string()));
        }
        Ok(Self { prefix })
    }

    /// Full argument vector for running `args` on `host`
    pub fn command_line(&self, host: &str, args: &[String]) -> Vec<String> {
        self.prefix
            .iter()
            .map(|a| a.replace(HOST_PLACEHOLDER, host))
            .chain(args.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, host: &str, args: &[String]) -> Result<String> {
        let argv = self.command_line(host, args);
        tracing::debug!(host, command = %args.join(" "), "Executing");
        run_captured(&argv)
            .await
            .map_err(|message| Error::execution(host, args, message))
    }
}

/// Runs the forwarding-table dump on the local control host
#[derive(Debug, Clone)]
pub struct LocalDump {
    command: Vec<String>,
}

impl LocalDump {
    /// `None` when `command` is empty (dumps disabled)
    pub fn new(command: Vec<String>) -> Option<Self> {
        if command.is_empty() {
            None
        } else {
            Some(Self { command })
        }
    }
}

#[async_trait]
impl DiagnosticDump for LocalDump {
    async fn dump_forwarding_state(&self) -> Result<String> {
        run_captured(&self.command)
            .await
            .map_err(|message| Error::execution("localhost", &self.command, message))
    }
}

/// Spawn `argv`, wait for it, and return stdout followed by stderr
///
/// Errors carry a human-readable reason; the caller attaches host and
/// command context.
async fn run_captured(argv: &[String]) -> std::result::Result<String, String> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| "empty command".to_string())?;

    let output = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to spawn '{}': {}", program, e))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        text.push_str(&stderr);
    }

    if !output.status.success() {
        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let detail = text.trim();
        return Err(if detail.is_empty() {
            status
        } else {
            format!("{}: {}", status, detail)
        });
    }

    Ok(text)
}
