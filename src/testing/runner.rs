//! Suite runner
//!
//! Loads a suite, then for every selected variant resolves its topology,
//! runs the setup steps, drives the phases and runs the teardown steps.
//! Each variant starts from the first phase; nothing carries over.

use std::path::Path;
use std::process::Stdio;

use colored::Colorize;
use tokio::process::Command as TokioCommand;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::exec::{CommandExecutor, DiagnosticDump, LocalDump, NoDump, ProcessExecutor};

use super::checks::{Check, Harness};
use super::config::{ShellStep, TestSuite, Variant};
use super::phase::{
    CheckFailure, FailureMode, PhaseKind, PhaseReport, PhaseStatus, RunReport, RunState,
};
use super::sequencer::{run_phases, Progress};

/// Options for a suite run
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Variants to run; empty runs all of them
    pub variants: Vec<String>,
    pub mode: FailureMode,
    pub verbose: bool,
    /// Suppress human-readable output (JSON mode)
    pub quiet: bool,
}

/// Run a test suite from a YAML file
pub async fn run_suite(
    path: &Path,
    config: &Config,
    options: &RunOptions,
) -> Result<Vec<RunReport>> {
    let suite = TestSuite::load(path)?;
    suite.check_patterns()?;
    let config = config.with_overrides(suite.polling.as_ref(), suite.timing.as_ref())?;

    let variants = select_variants(&suite, &options.variants)?;

    let program = config.executor_program()?;
    tracing::debug!(program = %program.display(), "Using executor");
    let executor = ProcessExecutor::new(config.executor.command.clone())?;
    let dump = diagnostic_dump(&config);

    if !options.quiet {
        println!(
            "\n{} {}",
            "Running Suite:".blue().bold(),
            suite.name.white().bold()
        );
        if let Some(desc) = &suite.description {
            println!("  {}", desc.dimmed());
        }
    }

    let mut reports = Vec::with_capacity(variants.len());
    for variant in variants {
        let report = run_variant(
            &suite,
            path,
            variant,
            &config,
            &executor,
            dump.as_ref(),
            options,
        )
        .await;
        reports.push(report);
    }

    if !options.quiet {
        print_summary(&reports);
    }
    Ok(reports)
}

/// Variants named in `names`, in suite order; all variants when empty
fn select_variants<'a>(suite: &'a TestSuite, names: &[String]) -> Result<Vec<&'a Variant>> {
    if names.is_empty() {
        return Ok(suite.variants.iter().collect());
    }

    for name in names {
        if suite.variant(name).is_none() {
            let available: Vec<&str> = suite.variants.iter().map(|v| v.name.as_str()).collect();
            return Err(Error::Config(format!(
                "Unknown variant '{}'. Available: {:?}",
                name, available
            )));
        }
    }

    Ok(suite
        .variants
        .iter()
        .filter(|v| names.contains(&v.name))
        .collect())
}

/// Forwarding-state dump from configuration, disabled if its program is missing
fn diagnostic_dump(config: &Config) -> Box<dyn DiagnosticDump> {
    let Some(dump) = LocalDump::new(config.diagnostics.dump.clone()) else {
        return Box::new(NoDump);
    };

    let program = &config.diagnostics.dump[0];
    if which::which(program).is_err() && !Path::new(program).exists() {
        tracing::warn!(program = %program, "Diagnostic dump program not found, dumps disabled");
        return Box::new(NoDump);
    }
    Box::new(dump)
}

/// Run every phase against one variant
pub async fn run_variant(
    suite: &TestSuite,
    suite_path: &Path,
    variant: &Variant,
    config: &Config,
    executor: &dyn CommandExecutor,
    dump: &dyn DiagnosticDump,
    options: &RunOptions,
) -> RunReport {
    let mut report = RunReport::new(&suite.name, &variant.name);

    if !options.quiet {
        println!("\n{} {}", "Variant:".cyan(), variant.name.white().bold());
    }

    let topology = match variant
        .resolve_topology(suite_path)
        .and_then(|t| suite.check_hosts(&t).map(|()| t))
    {
        Ok(t) => t,
        Err(e) => return abort(report, e, options),
    };

    tracing::info!(
        variant = %variant.name,
        routers = topology.routers.len(),
        interfaces = topology.interface_count(),
        "Topology resolved"
    );

    if let Some(steps) = &variant.setup {
        if !options.quiet {
            println!("{}", "  Setup:".cyan());
        }
        if let Err(e) = run_shell_steps(steps, options).await {
            run_teardown(variant, options).await;
            return abort(report, e, options);
        }
    }

    let harness = Harness {
        executor,
        dump,
        topology: &topology,
        expect: &suite.expect,
        probes: &suite.probes,
        polling: &config.polling,
        timing: &config.timing,
    };

    let mut progress = ConsoleProgress {
        quiet: options.quiet,
        verbose: options.verbose,
    };
    run_phases(&harness, options.mode, &mut progress, &mut report).await;

    run_teardown(variant, options).await;

    if !options.quiet {
        if report.passed() {
            println!(
                "  {} {}",
                "✓".green().bold(),
                format!("Variant {} passed", variant.name).green().bold()
            );
        } else {
            println!(
                "  {} {}",
                "✗".red().bold(),
                format!("Variant {} failed", variant.name).red().bold()
            );
        }
    }

    report
}

/// Record an error that kept the phases from running
fn abort(mut report: RunReport, error: Error, options: &RunOptions) -> RunReport {
    tracing::error!(variant = %report.variant, error = %error, "Variant aborted");
    if !options.quiet {
        println!("  {} {}", "✗".red(), error);
    }
    report.error = Some(CheckFailure::from(&error));
    report.phases = PhaseKind::ALL
        .iter()
        .map(|&kind| PhaseReport::pending(kind, 0))
        .collect();
    report.state = RunState::Aborted;
    report
}

async fn run_teardown(variant: &Variant, options: &RunOptions) {
    if let Some(steps) = &variant.teardown {
        if !options.quiet {
            println!("{}", "  Teardown:".cyan());
        }
        if let Err(e) = run_shell_steps(steps, options).await {
            tracing::warn!(variant = %variant.name, error = %e, "Teardown failed");
        }
    }
}

/// Run shell steps in order, stopping at the first failure
async fn run_shell_steps(steps: &[ShellStep], options: &RunOptions) -> Result<()> {
    for step in steps {
        if options.verbose && !options.quiet {
            println!("    $ {}", step.shell.dimmed());
        }

        let inherit = options.verbose && !options.quiet;
        let status = TokioCommand::new("sh")
            .arg("-c")
            .arg(&step.shell)
            .stdin(Stdio::null())
            .stdout(if inherit { Stdio::inherit() } else { Stdio::null() })
            .stderr(if inherit { Stdio::inherit() } else { Stdio::null() })
            .status()
            .await
            .map_err(|e| Error::Setup {
                step: step.shell.clone(),
                reason: format!("failed to execute: {}", e),
            })?;

        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(Error::Setup {
                step: step.shell.clone(),
                reason,
            });
        }
        if !options.quiet {
            println!("    {} {}", "✓".green(), step.shell.dimmed());
        }
    }
    Ok(())
}

/// Prints phase and check progress to stdout
struct ConsoleProgress {
    quiet: bool,
    verbose: bool,
}

impl Progress for ConsoleProgress {
    fn phase_started(&mut self, phase: PhaseKind, checks: usize) {
        if self.quiet {
            return;
        }
        println!(
            "  {} {}",
            phase.name().white().bold(),
            format!("({}, {} checks)", phase.description(), checks).dimmed()
        );
    }

    fn check_passed(&mut self, _phase: PhaseKind, check: &Check<'_>) {
        if self.quiet || !self.verbose {
            return;
        }
        println!("    {} {}", "✓".green(), check.to_string().dimmed());
    }

    fn check_failed(&mut self, _phase: PhaseKind, check: &Check<'_>, error: &Error) {
        if self.quiet {
            return;
        }
        println!("    {} {}: {}", "✗".red(), check, error);
    }

    fn phase_finished(&mut self, report: &PhaseReport) {
        if self.quiet {
            return;
        }
        let secs = report.elapsed_ms as f64 / 1000.0;
        match report.status {
            PhaseStatus::Passed => println!(
                "    {} {} {}",
                "✓".green(),
                format!("{} passed", report.phase).green(),
                format!(
                    "({}/{} checks, {:.1}s)",
                    report.checks_run, report.checks_total, secs
                )
                .dimmed()
            ),
            PhaseStatus::Failed => println!(
                "    {} {} {}",
                "✗".red(),
                format!("{} failed", report.phase).red(),
                format!("({} failures, {:.1}s)", report.failures.len(), secs).dimmed()
            ),
            PhaseStatus::Pending | PhaseStatus::Running => {}
        }
    }
}

/// Print one line per variant plus skipped phases of aborted runs
pub fn print_summary(reports: &[RunReport]) {
    println!("\n{}", "Summary:".blue().bold());
    for report in reports {
        if report.passed() {
            println!("  {} {}", "✓".green(), report.variant);
            continue;
        }

        let reason = match (report.failed_phase(), &report.error) {
            (Some(phase), _) => format!("phase '{}' failed", phase.phase),
            (None, Some(error)) => error.message.clone(),
            (None, None) => "not completed".to_string(),
        };
        println!("  {} {}: {}", "✗".red(), report.variant, reason);

        let skipped: Vec<&str> = report
            .phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Pending)
            .map(|p| p.phase.name())
            .collect();
        if !skipped.is_empty() && report.error.is_none() {
            println!("    {} {}", "skipped:".dimmed(), skipped.join(", ").dimmed());
        }
    }
    println!();
}
