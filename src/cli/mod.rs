//! CLI command handling
//!
//! Dispatches CLI commands to the test engine and formats output.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::exec::{NoDump, ProcessExecutor};
use crate::testing::{self, FailureMode, Harness, PhaseKind, RunOptions, TestSuite};
use crate::topology::Topology;

/// Options shared by every command
#[derive(Debug, Default, Clone)]
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Dispatch a CLI command
///
/// Returns `Ok(false)` when the command ran but a test failed.
pub async fn dispatch(command: Commands, opts: &GlobalOpts) -> Result<bool> {
    match command {
        Commands::Run {
            suite,
            variants,
            collect_all,
            json,
        } => {
            let config = Config::load(opts.config.as_deref())?;
            let options = RunOptions {
                variants,
                mode: if collect_all {
                    FailureMode::CollectAll
                } else {
                    FailureMode::StopAtFirst
                },
                verbose: opts.verbose,
                quiet: json,
            };

            let reports = tokio::select! {
                result = testing::run_suite(&suite, &config, &options) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted, teardown steps were not run");
                    return Err(Error::Interrupted);
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }

            Ok(reports.iter().all(|r| r.passed()))
        }

        Commands::Validate { suite } => {
            let config = Config::load(opts.config.as_deref())?;
            validate(&suite, &config)?;
            Ok(true)
        }

        Commands::Phases => {
            for (i, phase) in PhaseKind::ALL.iter().enumerate() {
                println!(
                    "{}. {:<20} {}",
                    i + 1,
                    phase.name(),
                    phase.description().dimmed()
                );
            }
            Ok(true)
        }
    }
}

/// Load everything a run would load and print the resulting plan
fn validate(path: &Path, config: &Config) -> Result<()> {
    let suite = TestSuite::load(path)?;
    suite.check_patterns()?;
    let config = config.with_overrides(suite.polling.as_ref(), suite.timing.as_ref())?;
    let executor = ProcessExecutor::new(config.executor.command.clone())?;

    println!("{} {}", "Suite:".blue().bold(), suite.name.white().bold());
    println!(
        "  {}",
        format!(
            "neighbors {}x, routes {}x, every {}ms",
            config.polling.neighbor_attempts,
            config.polling.route_attempts,
            config.polling.interval_ms
        )
        .dimmed()
    );

    for variant in &suite.variants {
        let topology = variant.resolve_topology(path)?;
        suite.check_hosts(&topology)?;

        println!("\n{} {}", "Variant:".cyan(), variant.name.white().bold());
        print_topology(&topology);

        let harness = Harness {
            executor: &executor,
            dump: &NoDump,
            topology: &topology,
            expect: &suite.expect,
            probes: &suite.probes,
            polling: &config.polling,
            timing: &config.timing,
        };
        for phase in PhaseKind::ALL {
            println!(
                "  {:<20} {} checks",
                phase.name(),
                harness.checks(phase).len()
            );
        }
    }

    println!("\n{} {}", "✓".green(), "Suite is valid".green());
    Ok(())
}

fn print_topology(topology: &Topology) {
    for router in &topology.routers {
        let interfaces: Vec<String> = router
            .interfaces
            .iter()
            .map(|i| i.effective_name())
            .collect();
        println!(
            "  {} {}",
            router.hostname.white(),
            interfaces.join(", ").dimmed()
        );
    }
}
