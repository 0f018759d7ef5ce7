use serde::{Deserialize, Serialize};

/// What the host runtime must do after a record-processing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Resume processing on a fresh thread; the failed record is replayed.
    RestartThread,
    /// Stop the local worker instance cleanly.
    ShutdownWorker,
    /// Terminate the whole application.
    ShutdownApplication,
}

impl RecoveryAction {
    pub const ALL: [RecoveryAction; 3] = [
        RecoveryAction::RestartThread,
        RecoveryAction::ShutdownWorker,
        RecoveryAction::ShutdownApplication,
    ];

    /// True for the actions that end processing.
    pub fn is_shutdown(self) -> bool {
        !matches!(self, RecoveryAction::RestartThread)
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryAction::RestartThread => write!(f, "RESTART_THREAD"),
            RecoveryAction::ShutdownWorker => write!(f, "SHUTDOWN_WORKER"),
            RecoveryAction::ShutdownApplication => write!(f, "SHUTDOWN_APPLICATION"),
        }
    }
}
