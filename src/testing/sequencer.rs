//! Phase sequencer
//!
//! Runs the phases strictly in [`PhaseKind::ALL`] order against one
//! variant. The first failed phase aborts the run; phases after it are
//! reported as pending, phases before it keep their results.

use std::time::Instant;

use crate::common::Error;

use super::checks::{Check, Harness};
use super::phase::{
    CheckFailure, FailureMode, PhaseKind, PhaseReport, PhaseStatus, RunReport, RunState,
};

/// Observer of sequencer progress
///
/// All methods default to doing nothing.
pub trait Progress {
    fn phase_started(&mut self, _phase: PhaseKind, _checks: usize) {}
    fn check_passed(&mut self, _phase: PhaseKind, _check: &Check<'_>) {}
    fn check_failed(&mut self, _phase: PhaseKind, _check: &Check<'_>, _error: &Error) {}
    fn phase_finished(&mut self, _report: &PhaseReport) {}
}

/// Progress observer that reports nothing
pub struct Quiet;

impl Progress for Quiet {}

/// Run every phase against `harness`, filling in `report`
pub async fn run_phases(
    harness: &Harness<'_>,
    mode: FailureMode,
    progress: &mut dyn Progress,
    report: &mut RunReport,
) {
    report.state = RunState::InProgress;
    report.phases = PhaseKind::ALL
        .iter()
        .map(|&kind| PhaseReport::pending(kind, harness.checks(kind).len()))
        .collect();

    for (index, &kind) in PhaseKind::ALL.iter().enumerate() {
        let phase_report = run_phase(harness, kind, mode, progress).await;
        let failed = phase_report.status == PhaseStatus::Failed;
        report.phases[index] = phase_report;

        if failed {
            tracing::warn!(phase = %kind, variant = %report.variant, "Phase failed, aborting run");
            report.state = RunState::Aborted;
            return;
        }
    }

    report.state = RunState::Completed;
}

/// Run the checks of a single phase
pub async fn run_phase(
    harness: &Harness<'_>,
    kind: PhaseKind,
    mode: FailureMode,
    progress: &mut dyn Progress,
) -> PhaseReport {
    let checks = harness.checks(kind);
    let mut report = PhaseReport::pending(kind, checks.len());
    let started = Instant::now();

    report.status = PhaseStatus::Running;
    tracing::info!(phase = %kind, checks = checks.len(), "Phase started");
    progress.phase_started(kind, checks.len());

    if !checks.is_empty() {
        harness.before_phase(kind).await;
    }

    for check in &checks {
        report.checks_run += 1;
        match harness.run_check(check).await {
            Ok(()) => progress.check_passed(kind, check),
            Err(e) => {
                tracing::debug!(phase = %kind, check = %check, error = %e, "Check failed");
                progress.check_failed(kind, check, &e);
                report.failures.push(CheckFailure::from(&e));

                // Execution errors end the phase whatever the mode
                if mode == FailureMode::StopAtFirst || !e.is_check_failure() {
                    break;
                }
            }
        }
    }

    report.status = if report.failures.is_empty() {
        PhaseStatus::Passed
    } else {
        PhaseStatus::Failed
    };
    report.set_elapsed(started.elapsed());
    tracing::info!(phase = %kind, status = ?report.status, "Phase finished");
    progress.phase_finished(&report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::NoDump;
    use crate::testing::mock::{healthy_output, CountingDump, Fixture, ScriptedExecutor};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Progress observer recording phase names as they start
    #[derive(Default)]
    struct Recorder {
        started: Vec<PhaseKind>,
        failed_checks: Vec<String>,
    }

    impl Progress for Recorder {
        fn phase_started(&mut self, phase: PhaseKind, _checks: usize) {
            self.started.push(phase);
        }

        fn check_failed(&mut self, _phase: PhaseKind, check: &Check<'_>, _error: &Error) {
            self.failed_checks.push(check.to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_phases_pass_in_order() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::converged();
        let harness = fixture.harness(&exec, &NoDump);
        let mut recorder = Recorder::default();
        let mut report = RunReport::new("bgp", "vlan");

        run_phases(&harness, FailureMode::StopAtFirst, &mut recorder, &mut report).await;

        assert!(report.passed(), "{report:?}");
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(recorder.started, PhaseKind::ALL.to_vec());
        let flap = report.phase(PhaseKind::Flap).unwrap();
        assert_eq!(flap.checks_run, 3);
        assert_eq!(flap.checks_total, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_failure_aborts_run() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::new(|_, args, _| {
            if args[0] == "ping" {
                Ok("3 packets transmitted, 0 received".to_string())
            } else {
                Ok(healthy_output(args))
            }
        });
        let harness = fixture.harness(&exec, &NoDump);
        let mut recorder = Recorder::default();
        let mut report = RunReport::new("bgp", "vlan");

        run_phases(&harness, FailureMode::StopAtFirst, &mut recorder, &mut report).await;

        assert_eq!(report.state, RunState::Aborted);
        let failed = report.failed_phase().unwrap();
        assert_eq!(failed.phase, PhaseKind::Connectivity);
        assert_eq!(failed.checks_run, 1);
        assert_eq!(failed.failures.len(), 1);
        assert_eq!(failed.failures[0].code, "ASSERTION_MISMATCH");
        assert!(failed.failures[0].message.contains("R1"));
        assert!(failed.failures[0].message.contains("192.168.120.10"));

        // Later phases never started
        assert_eq!(recorder.started, vec![PhaseKind::Connectivity]);
        assert!(report.phases[1..]
            .iter()
            .all(|p| p.status == PhaseStatus::Pending));
        assert_eq!(exec.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_reports_every_failure_in_phase() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::new(|_, args, _| {
            if args[0] == "ping" {
                Ok(String::new())
            } else {
                Ok(healthy_output(args))
            }
        });
        let harness = fixture.harness(&exec, &NoDump);
        let mut recorder = Recorder::default();
        let mut report = RunReport::new("bgp", "vlan");

        run_phases(&harness, FailureMode::CollectAll, &mut recorder, &mut report).await;

        let failed = report.failed_phase().unwrap();
        assert_eq!(failed.phase, PhaseKind::Connectivity);
        assert_eq!(failed.checks_run, 2);
        assert_eq!(
            recorder.failed_checks,
            vec!["R1 reaches 192.168.120.10", "R2 reaches 192.168.120.5"]
        );
        assert_eq!(report.state, RunState::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_error_stops_phase_even_when_collecting() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::new(|host, args, _| {
            if args[0] == "ping" {
                Err(Error::execution(host, args, "no such container"))
            } else {
                Ok(healthy_output(args))
            }
        });
        let harness = fixture.harness(&exec, &NoDump);
        let mut report = RunReport::new("bgp", "vlan");

        run_phases(&harness, FailureMode::CollectAll, &mut Quiet, &mut report).await;

        let failed = report.failed_phase().unwrap();
        assert_eq!(failed.checks_run, 1);
        assert_eq!(failed.failures[0].code, "EXECUTION_ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_timeout_keeps_earlier_results() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::new(|_, args, _| {
            if args[0] == "ip" && args[1] == "route" {
                Ok(String::new())
            } else {
                Ok(healthy_output(args))
            }
        });
        let harness = fixture.harness(&exec, &NoDump);
        let mut report = RunReport::new("bgp", "vlan");

        run_phases(&harness, FailureMode::StopAtFirst, &mut Quiet, &mut report).await;

        let statuses: Vec<PhaseStatus> = report.phases.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                PhaseStatus::Passed,
                PhaseStatus::Passed,
                PhaseStatus::Passed,
                PhaseStatus::Failed,
                PhaseStatus::Pending,
                PhaseStatus::Pending,
            ]
        );
        let routes = report.phase(PhaseKind::Routes).unwrap();
        assert_eq!(routes.failures[0].code, "CONVERGENCE_TIMEOUT");
        assert!(routes.failures[0].message.contains("R2 has route 192.168.150.0/24"));
        assert!(routes.failures[0].message.contains("4 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dumps_follow_inter_connectivity_and_flap_checks() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::converged();
        let dump = CountingDump::default();
        let harness = fixture.harness(&exec, &dump);

        let mut dumps = Vec::new();
        for kind in PhaseKind::ALL {
            let report = run_phase(&harness, kind, FailureMode::StopAtFirst, &mut Quiet).await;
            assert_eq!(report.status, PhaseStatus::Passed, "{kind}");
            dumps.push((kind, dump.take()));
        }

        // One dump per remote ping and one per flapped interface
        assert_eq!(
            dumps,
            vec![
                (PhaseKind::Connectivity, 0),
                (PhaseKind::Daemon, 0),
                (PhaseKind::Neighbors, 0),
                (PhaseKind::Routes, 0),
                (PhaseKind::InterConnectivity, 1),
                (PhaseKind::Flap, 3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_phase_waits_for_settle() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::converged();
        let harness = fixture.harness(&exec, &NoDump);

        let start = Instant::now();
        let report =
            run_phase(&harness, PhaseKind::Daemon, FailureMode::StopAtFirst, &mut Quiet).await;
        assert_eq!(start.elapsed(), fixture.timing.daemon_settle());
        assert_eq!(report.status, PhaseStatus::Passed);
        assert_eq!(report.checks_run, 2);
        assert_eq!(exec.calls(), vec!["R1: ps ax", "R2: ps ax"]);

        // Connectivity has no settle delay
        let start = Instant::now();
        run_phase(&harness, PhaseKind::Connectivity, FailureMode::StopAtFirst, &mut Quiet).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flap_phase_settles_twice_per_interface() {
        let fixture = Fixture::vlan();
        let exec = ScriptedExecutor::converged();
        let harness = fixture.harness(&exec, &NoDump);

        let start = Instant::now();
        run_phase(&harness, PhaseKind::Flap, FailureMode::StopAtFirst, &mut Quiet).await;
        assert_eq!(start.elapsed(), fixture.timing.flap_settle() * 6);
    }

    #[tokio::test]
    async fn test_empty_phase_passes_without_waiting() {
        let mut fixture = Fixture::vlan();
        fixture.expect.connectivity.clear();
        let exec = ScriptedExecutor::converged();
        let harness = fixture.harness(&exec, &NoDump);

        let report = run_phase(
            &harness,
            PhaseKind::Connectivity,
            FailureMode::StopAtFirst,
            &mut Quiet,
        )
        .await;
        assert_eq!(report.status, PhaseStatus::Passed);
        assert_eq!(report.checks_run, 0);
        assert_eq!(exec.call_count(), 0);
    }
}
