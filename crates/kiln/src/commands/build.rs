//! Production build command.

use anyhow::{bail, Result};
use kiln_pipeline::{pipeline_graph, run_entry, Entry, SiteConfig, TaskContext};

use super::{on_orchestrator, Outcome};

/// Run the build sequence.
pub async fn run(config: SiteConfig) -> Result<()> {
    tracing::info!("Building {}...", config.dist().display());

    let outcome = on_orchestrator(move || {
        let graph = pipeline_graph()?;
        let ctx = TaskContext::new(config);
        let mut exec = graph.execution();
        run_entry(&mut exec, &ctx, Entry::Build)?;
        Ok(())
    })
    .await?;

    if outcome == Outcome::Interrupted {
        bail!("Build interrupted");
    }

    Ok(())
}
