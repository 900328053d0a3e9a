//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Placeholder in the executor command replaced by the target hostname
pub const HOST_PLACEHOLDER: &str = "{host}";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How commands reach a named host
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Local diagnostic commands
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Convergence polling budgets
    #[serde(default)]
    pub polling: Polling,

    /// Fixed settle delays
    #[serde(default)]
    pub timing: Timing,
}

/// Command prefix used to run a probe on a host
#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Argument vector prefix; `{host}` is replaced by the hostname and the
    /// probe's own arguments are appended
    #[serde(default = "default_executor_command")]
    pub command: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: default_executor_command(),
        }
    }
}

fn default_executor_command() -> Vec<String> {
    vec!["docker".into(), "exec".into(), HOST_PLACEHOLDER.into()]
}

/// Forwarding-state dump run on the control host
#[derive(Debug, Deserialize, Clone)]
pub struct DiagnosticsConfig {
    /// Command to dump the forwarding table; empty disables dumps
    #[serde(default = "default_dump_command")]
    pub dump: Vec<String>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            dump: default_dump_command(),
        }
    }
}

fn default_dump_command() -> Vec<String> {
    vec!["vnet".into(), "show".into(), "ip".into(), "fib".into()]
}

/// Attempt budgets for the convergence poller
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Polling {
    /// Attempts while waiting for a BGP session to reach Established
    #[serde(default = "default_neighbor_attempts")]
    pub neighbor_attempts: u32,

    /// Attempts while waiting for a route to show up in the kernel table
    #[serde(default = "default_route_attempts")]
    pub route_attempts: u32,

    /// Delay between two unsuccessful attempts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            neighbor_attempts: default_neighbor_attempts(),
            route_attempts: default_route_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_neighbor_attempts() -> u32 {
    120
}
fn default_route_attempts() -> u32 {
    60
}
fn default_interval_ms() -> u64 {
    1000
}

impl Polling {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Settle delays in milliseconds
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Timing {
    /// Wait before checking that the routing daemon is running
    #[serde(default = "default_settle_ms")]
    pub daemon_settle_ms: u64,

    /// Wait after each link state change during the flap phase
    #[serde(default = "default_settle_ms")]
    pub flap_settle_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            daemon_settle_ms: default_settle_ms(),
            flap_settle_ms: default_settle_ms(),
        }
    }
}

fn default_settle_ms() -> u64 {
    1000
}

impl Timing {
    pub fn daemon_settle(&self) -> Duration {
        Duration::from_millis(self.daemon_settle_ms)
    }

    pub fn flap_settle(&self) -> Duration {
        Duration::from_millis(self.flap_settle_ms)
    }
}

/// Per-suite overrides for polling budgets
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PollingOverrides {
    pub neighbor_attempts: Option<u32>,
    pub route_attempts: Option<u32>,
    pub interval_ms: Option<u64>,
}

/// Per-suite overrides for settle delays
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TimingOverrides {
    pub daemon_settle_ms: Option<u64>,
    pub flap_settle_ms: Option<u64>,
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if no file exists. An explicitly
    /// given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "Configuration file '{}' not found",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => config_path().filter(|p| p.exists()),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        tracing::debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply suite-level overrides on top of this configuration
    pub fn with_overrides(
        &self,
        polling: Option<&PollingOverrides>,
        timing: Option<&TimingOverrides>,
    ) -> Result<Self> {
        let mut config = self.clone();
        if let Some(p) = polling {
            if let Some(n) = p.neighbor_attempts {
                config.polling.neighbor_attempts = n;
            }
            if let Some(n) = p.route_attempts {
                config.polling.route_attempts = n;
            }
            if let Some(ms) = p.interval_ms {
                config.polling.interval_ms = ms;
            }
        }
        if let Some(t) = timing {
            if let Some(ms) = t.daemon_settle_ms {
                config.timing.daemon_settle_ms = ms;
            }
            if let Some(ms) = t.flap_settle_ms {
                config.timing.flap_settle_ms = ms;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject budgets that would make polling meaningless
    pub fn validate(&self) -> Result<()> {
        if self.executor.command.is_empty() {
            return Err(Error::Config("executor.command must not be empty".to_string()));
        }
        if self.polling.neighbor_attempts == 0 || self.polling.route_attempts == 0 {
            return Err(Error::Config(
                "polling attempts must be at least 1".to_string(),
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(Error::Config(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Locate the executor program
    ///
    /// Checks explicit paths first, then searches PATH.
    pub fn executor_program(&self) -> Result<PathBuf> {
        let program = self
            .executor
            .command
            .first()
            .ok_or_else(|| Error::Config("executor.command must not be empty".to_string()))?;

        let as_path = Path::new(program);
        if as_path.components().count() > 1 {
            if as_path.exists() {
                return Ok(as_path.to_path_buf());
            }
            return Err(Error::Config(format!(
                "Executor program '{}' does not exist",
                program
            )));
        }

        which::which(program).map_err(|_| {
            Error::Config(format!("Executor program '{}' not found in PATH", program))
        })
    }
}
