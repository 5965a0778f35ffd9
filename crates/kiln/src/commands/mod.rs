//! Subcommand implementations.

use std::fmt::Display;
use std::sync::{Arc, OnceLock};

use anyhow::{anyhow, Result};

pub mod build;
pub mod dev;
pub mod prod;
pub mod task;
pub mod tasks;

/// How an orchestrated run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Interrupted,
}

/// Run `work` on a dedicated thread with the tokio runtime entered.
///
/// Task bodies do blocking file I/O and may spawn servers onto the
/// runtime. Ctrl-C stops waiting and reports [`Outcome::Interrupted`]; the
/// thread is abandoned and ends with the process.
pub async fn on_orchestrator<F, T>(work: F) -> Result<Outcome<T>>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::runtime::Handle::current();
    let (tx, rx) = tokio::sync::oneshot::channel();

    std::thread::Builder::new()
        .name("kiln-orchestrator".to_string())
        .spawn(move || {
            let _guard = handle.enter();
            let _ = tx.send(work());
        })?;

    tokio::select! {
        result = rx => {
            let value = result.map_err(|_| anyhow!("orchestrator thread panicked"))??;
            Ok(Outcome::Completed(value))
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(Outcome::Interrupted)
        }
    }
}

/// Failure of a long-running command's sequence.
///
/// Recorded on the orchestrator before it settles into watching or serving,
/// so the command still exits non-zero after Ctrl-C.
#[derive(Debug, Clone, Default)]
pub struct SequenceStatus(Arc<OnceLock<String>>);

impl SequenceStatus {
    /// Log a failed sequence and remember it.
    pub fn fail(&self, err: impl Display) {
        tracing::error!("{}", err);
        let _ = self.0.set(err.to_string());
    }

    /// The command's result once everything has shut down.
    pub fn finish(&self) -> Result<()> {
        match self.0.get() {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

/// Keep servers alive until Ctrl-C.
pub async fn wait_for_shutdown() -> Result<()> {
    tracing::info!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
