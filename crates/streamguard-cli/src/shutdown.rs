//! Ctrl+C / SIGTERM hook: the first signal asks the runner to stop after the
//! current record, a second one exits immediately.

use std::future::Future;

use anyhow::{Context, Result};
use streamguard_core::ShutdownSignal;

/// Exit status for a forced stop (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

/// Spawn the `streamguard-shutdown-hook` thread watching for termination signals.
pub fn install_shutdown_hook(signal: ShutdownSignal) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not build signal runtime")?;
    std::thread::Builder::new()
        .name("streamguard-shutdown-hook".into())
        .spawn(move || {
            rt.block_on(async {
                forward_shutdown(wait_for_shutdown_signal(), &signal).await;
                let which = wait_for_shutdown_signal().await;
                tracing::warn!("{which} again; exiting without draining");
                std::process::exit(FORCED_EXIT_CODE);
            })
        })
        .context("could not spawn shutdown hook thread")?;
    Ok(())
}

/// Wait for `fired`, then request a cooperative stop.
pub async fn forward_shutdown<F>(fired: F, signal: &ShutdownSignal)
where
    F: Future<Output = &'static str>,
{
    let which = fired.await;
    tracing::info!("{which}; stopping stream after the current record");
    signal.shutdown();
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, returning a description of which signal fired.
async fn wait_for_shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT (Ctrl+C) received",
                _ = sigterm.recv() => "SIGTERM received",
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not register SIGTERM handler; watching Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT (Ctrl+C) received"
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT (Ctrl+C) received"
    }
}
