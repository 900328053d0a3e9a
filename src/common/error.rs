//! Error types for topocheck
//!
//! Messages name the host, the check and (for timeouts) the attempt budget,
//! so a failed run can be diagnosed from its report alone.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for topocheck
#[derive(Error, Debug)]
pub enum Error {
    // === Check Errors ===
    #[error("Command '{command}' failed on {host}: {message}")]
    Execution {
        host: String,
        command: String,
        message: String,
    },

    #[error("{context}: output does not match '{pattern}'. Got: '{output}'")]
    AssertionMismatch {
        context: String,
        pattern: String,
        output: String,
    },

    #[error("{subject} did not converge after {attempts} attempts ({interval_ms}ms apart)")]
    ConvergenceTimeout {
        subject: String,
        attempts: u32,
        interval_ms: u64,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Unknown host '{0}' in topology")]
    UnknownHost(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Run Errors ===
    #[error("Shell step '{step}' failed: {reason}")]
    Setup { step: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run interrupted")]
    Interrupted,
}

/// Longest output excerpt carried in an assertion error
const OUTPUT_EXCERPT_LEN: usize = 200;

impl Error {
    /// Create an execution error for a command run on `host`
    pub fn execution<S: AsRef<str>>(host: &str, args: &[S], message: impl Into<String>) -> Self {
        Self::Execution {
            host: host.to_string(),
            command: args.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(" "),
            message: message.into(),
        }
    }

    /// Create an assertion mismatch, truncating long command output
    pub fn assertion_mismatch(context: &str, pattern: &str, output: &str) -> Self {
        let output = if output.len() > OUTPUT_EXCERPT_LEN {
            let mut end = OUTPUT_EXCERPT_LEN;
            while !output.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &output[..end])
        } else {
            output.to_string()
        };

        Self::AssertionMismatch {
            context: context.to_string(),
            pattern: pattern.to_string(),
            output,
        }
    }

    /// Whether this error is a check failure (as opposed to a harness problem)
    pub fn is_check_failure(&self) -> bool {
        matches!(
            self,
            Error::AssertionMismatch { .. } | Error::ConvergenceTimeout { .. }
        )
    }

    /// Short machine-readable code for JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::Execution { .. } => "EXECUTION_ERROR",
            Error::AssertionMismatch { .. } => "ASSERTION_MISMATCH",
            Error::ConvergenceTimeout { .. } => "CONVERGENCE_TIMEOUT",
            Error::InvalidPattern { .. } => "INVALID_PATTERN",
            Error::Config(_)
            | Error::ConfigParse(_)
            | Error::UnknownHost(_)
            | Error::FileRead { .. } => "CONFIG_ERROR",
            Error::Setup { .. } => "SETUP_ERROR",
            Error::Interrupted => "INTERRUPTED",
            Error::Json(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_joins_command() {
        let err = Error::execution("R1", &["ping", "-c3", "10.0.0.1"], "exit status 1");
        assert_eq!(
            err.to_string(),
            "Command 'ping -c3 10.0.0.1' failed on R1: exit status 1"
        );
        assert_eq!(err.code(), "EXECUTION_ERROR");
        assert!(!err.is_check_failure());
    }

    #[test]
    fn test_assertion_mismatch_truncates_output() {
        let output = "x".repeat(500);
        let err = Error::assertion_mismatch("R1 reaches 10.0.0.1", "received", &output);
        match &err {
            Error::AssertionMismatch { output, .. } => {
                assert_eq!(output.len(), OUTPUT_EXCERPT_LEN + 3);
                assert!(output.ends_with("..."));
            }
            _ => panic!("Expected AssertionMismatch"),
        }
        assert!(err.is_check_failure());
    }

    #[test]
    fn test_setup_and_file_errors_have_codes() {
        let err = Error::Setup {
            step: "exit 7".to_string(),
            reason: "exit code 7".to_string(),
        };
        assert_eq!(err.to_string(), "Shell step 'exit 7' failed: exit code 7");
        assert_eq!(err.code(), "SETUP_ERROR");

        let err = Error::FileRead {
            path: "suite.yaml".to_string(),
            error: "No such file or directory".to_string(),
        };
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_timeout_message_names_budget() {
        let err = Error::ConvergenceTimeout {
            subject: "R1 peers with R2".to_string(),
            attempts: 120,
            interval_ms: 1000,
        };
        assert_eq!(
            err.to_string(),
            "R1 peers with R2 did not converge after 120 attempts (1000ms apart)"
        );
    }
}
