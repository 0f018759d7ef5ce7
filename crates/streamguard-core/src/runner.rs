//! In-process host runtime: feeds records through a [`RecordTransform`] and
//! carries out whatever [`RecoveryAction`] the registered handler returns.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::action::RecoveryAction;
use crate::error::GuardResult;
use crate::policy::FailureHandler;
use crate::transform::RecordTransform;

/// Cooperative stop request, checked between records.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Input exhausted.
    Completed,
    /// Handler chose [`RecoveryAction::ShutdownWorker`] while processing `record`.
    WorkerStopped { record: usize },
    /// Handler chose [`RecoveryAction::ShutdownApplication`] while processing `record`.
    ApplicationShutdown { record: usize },
    /// [`ShutdownSignal`] fired before `record` was read.
    Interrupted { record: usize },
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "COMPLETED"),
            RunOutcome::WorkerStopped { record } => write!(f, "WORKER_STOPPED at record {record}"),
            RunOutcome::ApplicationShutdown { record } => {
                write!(f, "APPLICATION_SHUTDOWN at record {record}")
            }
            RunOutcome::Interrupted { record } => write!(f, "INTERRUPTED before record {record}"),
        }
    }
}

/// One handler decision, as observed by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// 1-based position of the record in the input.
    pub record: usize,
    /// Attempt at this record that failed (1 = first try).
    pub attempt: u32,
    pub action: RecoveryAction,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub restarts: u32,
    pub decisions: Vec<Decision>,
    pub outcome: RunOutcome,
}

pub struct StreamRunner {
    name: String,
    handler: Arc<dyn FailureHandler>,
    shutdown: ShutdownSignal,
}

impl StreamRunner {
    pub fn new(name: impl Into<String>, handler: Arc<dyn FailureHandler>) -> Self {
        Self { name: name.into(), handler, shutdown: ShutdownSignal::new() }
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Process `records` in order, writing one output line per success to `out`.
    ///
    /// A failed record is replayed after a thread restart, so it may be
    /// transformed more than once but is never skipped.
    pub fn run<T, I, W>(&self, transform: &mut T, records: I, out: &mut W) -> GuardResult<RunReport>
    where
        T: RecordTransform,
        I: IntoIterator<Item = String>,
        W: Write,
    {
        info!("{}: starting", self.name);
        let mut report = RunReport {
            processed: 0,
            restarts: 0,
            decisions: Vec::new(),
            outcome: RunOutcome::Completed,
        };

        for (idx, value) in records.into_iter().enumerate() {
            let record = idx + 1;
            if self.shutdown.is_shutdown() {
                report.outcome = RunOutcome::Interrupted { record };
                break;
            }
            if let Some(outcome) = self.process_record(transform, record, &value, out, &mut report)? {
                report.outcome = outcome;
                break;
            }
        }

        out.flush()?;
        info!(
            "{}: stopped ({}); processed={} restarts={}",
            self.name, report.outcome, report.processed, report.restarts
        );
        Ok(report)
    }

    // Returns Some(outcome) when the handler ended the run.
    fn process_record<T, W>(
        &self,
        transform: &mut T,
        record: usize,
        value: &str,
        out: &mut W,
        report: &mut RunReport,
    ) -> GuardResult<Option<RunOutcome>>
    where
        T: RecordTransform,
        W: Write,
    {
        let mut attempt = 1u32;
        loop {
            match transform.apply(value) {
                Ok(output) => {
                    writeln!(out, "{output}")?;
                    report.processed += 1;
                    return Ok(None);
                }
                Err(e) => {
                    let action = self.handler.on_failure(&e);
                    report.decisions.push(Decision {
                        record,
                        attempt,
                        action,
                        cause: e.to_string(),
                    });
                    match action {
                        RecoveryAction::RestartThread => {
                            report.restarts += 1;
                            info!("{}: record {} failed ({}); replacing thread", self.name, record, e);
                            attempt += 1;
                        }
                        RecoveryAction::ShutdownWorker => {
                            warn!("{}: record {} failed ({}); stopping worker", self.name, record, e);
                            return Ok(Some(RunOutcome::WorkerStopped { record }));
                        }
                        RecoveryAction::ShutdownApplication => {
                            warn!("{}: record {} failed ({}); shutting down application", self.name, record, e);
                            return Ok(Some(RunOutcome::ApplicationShutdown { record }));
                        }
                    }
                }
            }
        }
    }
}
