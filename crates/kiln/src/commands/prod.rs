//! Production preview command.

use anyhow::Result;
use kiln_pipeline::{hold, pipeline_graph, run_entry, Entry, SiteConfig, TaskContext};

use super::{on_orchestrator, wait_for_shutdown, Outcome, SequenceStatus};

/// Build, then serve the distribution root until interrupted.
pub async fn run(mut config: SiteConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.prod.port = port;
        config.validate()?;
    }

    let status = SequenceStatus::default();
    let recorder = status.clone();

    let outcome = on_orchestrator(move || {
        let graph = pipeline_graph()?;
        let ctx = TaskContext::new(config);
        let mut exec = graph.execution();

        if let Err(e) = run_entry(&mut exec, &ctx, Entry::RunProd) {
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
