//! Development session command.

use anyhow::Result;
use kiln_pipeline::{hold, pipeline_graph, run_entry, Entry, SiteConfig, TaskContext};

use super::{on_orchestrator, wait_for_shutdown, Outcome, SequenceStatus};

/// Start the dev server, build sources and re-run tasks on change.
///
/// A failing step is reported, but a server or watcher it started keeps
/// running until Ctrl-C; the command then exits with the failure.
pub async fn run(mut config: SiteConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.dev.port = port;
        config.validate()?;
    }

    let status = SequenceStatus::default();
    let recorder = status.clone();

    let outcome = on_orchestrator(move || {
        let graph = pipeline_graph()?;
        let ctx = TaskContext::new(config);
        let mut exec = graph.execution();

        if let Err(e) = run_entry(&mut exec, &ctx, Entry::RunDev) {
            recorder.fail(e);
        }
        Ok(hold(&mut exec, &ctx))
    })
    .await?;

    if outcome == Outcome::Completed(true) {
        wait_for_shutdown().await?;
    }

    status.finish()
}
