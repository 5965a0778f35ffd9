//! Ad-hoc task sequence command.

use anyhow::Result;
use kiln_pipeline::{hold, pipeline_graph, SiteConfig, TaskContext, TaskId};

use super::{on_orchestrator, wait_for_shutdown, Outcome, SequenceStatus};

/// Run `names` in order as one sequence.
///
/// A sequence that starts a watcher keeps dispatching changes; one that
/// starts a server keeps it up until Ctrl-C, even when a later task failed.
pub async fn run(config: SiteConfig, names: Vec<TaskId>) -> Result<()> {
    let status = SequenceStatus::default();
    let recorder = status.clone();

    let outcome = on_orchestrator(move || {
        let graph = pipeline_graph()?;
        let ctx = TaskContext::new(config);
        let mut exec = graph.execution();

        match exec.run_sequence(&ctx, &names) {
            Ok(()) => {
                let listed: Vec<&str> = names.iter().map(|name| name.name()).collect();
                tracing::info!("Finished {}", listed.join(", "));
            }
            Err(e) => recorder.fail(e),
        }
        Ok(hold(&mut exec, &ctx))
    })
    .await?;

    if outcome == Outcome::Completed(true) {
        wait_for_shutdown().await?;
    }

    status.finish()
}
