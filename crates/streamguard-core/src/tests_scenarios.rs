use std::sync::Arc;

use crate::clock::ManualClock;
use crate::config::EscalationConfig;
use crate::policy::{EscalationPolicy, FailureHandler};
use crate::runner::{RunOutcome, StreamRunner};
use crate::transform::{InjectedFailureTransform, RecordTransform};
use crate::RecoveryAction;

const HOUR_MS: i64 = 3_600_000;

#[test]
fn injected_failures_escalate_on_second_failure() {
    let clock = Arc::new(ManualClock::new(0));
    let policy = EscalationPolicy::with_clock(EscalationConfig::new(2, HOUR_MS).unwrap(), clock.clone());
    let mut transform = InjectedFailureTransform::default();

    let mut decisions = Vec::new();
    for call in 1..=15u64 {
        clock.advance(100);
        if let Err(e) = transform.apply("record") {
            let action = policy.on_failure(&e);
            decisions.push((call, action));
            if action == RecoveryAction::ShutdownApplication {
                break;
            }
        }
    }

    assert_eq!(
        decisions,
        vec![(2, RecoveryAction::RestartThread), (8, RecoveryAction::ShutdownApplication)]
    );
    // call 15 never happens
    assert_eq!(transform.calls(), 8);
}

#[test]
fn runner_with_policy_shuts_down_application() {
    let clock = Arc::new(ManualClock::new(0));
    let policy = Arc::new(EscalationPolicy::with_clock(
        EscalationConfig::new(2, HOUR_MS).unwrap(),
        clock,
    ));
    let runner = StreamRunner::new("scenario", policy.clone());
    let mut transform = InjectedFailureTransform::default();
    let input: Vec<String> = (1..=15).map(|i| format!("value-{i}")).collect();
    let mut out = Vec::new();

    let report = runner.run(&mut transform, input, &mut out).unwrap();

    // call 2 fails on record 2 and is replayed by call 3; call 8 hits record 7
    assert_eq!(report.outcome, RunOutcome::ApplicationShutdown { record: 7 });
    assert_eq!(report.restarts, 1);
    assert_eq!(report.processed, 6);
    assert_eq!(policy.stats().escalations, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("VALUE-1\nVALUE-2\n"));
}

#[test]
fn runner_with_short_window_survives_all_failures() {
    let clock = Arc::new(ManualClock::new(0));
    let policy = Arc::new(EscalationPolicy::with_clock(
        EscalationConfig::new(2, 1_000).unwrap(),
        clock.clone(),
    ));
    let runner = StreamRunner::new("scenario", policy);
    let mut transform = InjectedFailureTransform::default();
    // each record takes 1s of clock time, so no two failures share a window
    let input = (1..=15).map(|i| {
        clock.advance(1_000);
        format!("v{i}")
    });
    let mut out = Vec::new();

    let report = runner.run(&mut transform, input, &mut out).unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.restarts, 3);
    assert_eq!(report.processed, 15);
    assert!(report.decisions.iter().all(|d| d.action == RecoveryAction::RestartThread));
}

#[test]
fn policy_never_selects_worker_shutdown() {
    let policy = EscalationPolicy::new(EscalationConfig::new(3, 50).unwrap());
    let err = crate::TransformError { call: 1 };
    for t in 0..500 {
        assert_ne!(policy.on_failure_at(&err, t * 7), RecoveryAction::ShutdownWorker);
    }
}
