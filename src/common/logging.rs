//! Logging and tracing configuration
//!
//! Human-facing progress goes to stdout through the runner; tracing
//! output goes to stderr, and optionally to a log file with full details
//! so long convergence runs can be inspected afterwards.

use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("topocheck=debug,warn")
        } else {
            EnvFilter::new("topocheck=info,warn")
        }
    })
}

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable. When
/// `log_file` is given, a second non-ANSI layer writes to that file (the
/// parent directory is created if needed). Returns the log file path if
/// file logging was set up.
pub fn init_cli(verbose: bool, log_file: Option<&Path>) -> Option<PathBuf> {
    let filter = default_filter(verbose);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!(
                        "Warning: Could not create log directory '{}': {}",
                        parent.display(),
                        e
                    );
                }
            }
        }

        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true);

                tracing_subscriber::registry()
                    .with(filter)
                    .with(stderr_layer)
                    .with(file_layer)
                    .init();

                return Some(path.to_path_buf());
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file '{}': {}", path.display(), e);
            }
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();

    None
}
