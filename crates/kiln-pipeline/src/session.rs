//! Running entry points and the dev-session watch loop.

use std::path::PathBuf;

use kiln_graph::{Execution, RunError, TaskGraph};

use crate::context::{ActiveWatch, TaskContext};
use crate::ids::{Entry, TaskId};

pub type PipelineGraph = TaskGraph<TaskId, TaskContext>;
pub type PipelineExecution<'g> = Execution<'g, TaskId, TaskContext>;

/// Run an entry point's steps in `exec` and log its completion message.
///
/// The execution stays with the caller, so anything a failing entry already
/// started (servers, watchers) can be kept alive and re-run against.
pub fn run_entry(
    exec: &mut PipelineExecution<'_>,
    ctx: &TaskContext,
    entry: Entry,
) -> Result<(), RunError<TaskId>> {
    exec.run_sequence(ctx, &entry.steps())?;
    tracing::info!("{}", entry.completion_message());
    Ok(())
}

/// Whether a server task has bound its listener in this execution.
pub fn is_serving(exec: &PipelineExecution<'_>) -> bool {
    exec.is_completed(TaskId::ConnectDev) || exec.is_completed(TaskId::ConnectProd)
}

/// Keep a settled sequence's long-running work going.
///
/// Runs the watch loop if `stream` installed a watcher, then reports whether
/// a server is still up for the caller to wait on.
pub fn hold(exec: &mut PipelineExecution<'_>, ctx: &TaskContext) -> bool {
    if let Some(watch) = ctx.take_watch() {
        watch_loop(exec, ctx, watch);
    }
    is_serving(exec)
}

/// Re-run tasks as watched files change, until the event channel closes.
///
/// Batches that queued up while a re-run was in progress are drained and
/// merged, so each task runs at most once per round. Re-runs never
/// overlap. A failing re-run is logged and the loop keeps going.
pub fn watch_loop(
    exec: &mut PipelineExecution<'_>,
    ctx: &TaskContext,
    mut watch: ActiveWatch,
) {
    while let Some(first) = watch.events.blocking_recv() {
        let mut changed: Vec<PathBuf> = first;
        while let Ok(more) = watch.events.try_recv() {
            changed.extend(more);
        }

        let tasks = watch.table.coalesce(changed.iter().map(PathBuf::as_path));
        if tasks.is_empty() {
            tracing::debug!("No task watches {} changed path(s)", changed.len());
            continue;
        }

        for task in tasks {
            tracing::info!("Change detected, re-running '{}'", task);
            if let Err(e) = exec.rerun(ctx, task) {
                tracing::error!("{}", e);
            }
        }
    }

    tracing::debug!("Watcher closed");
}
