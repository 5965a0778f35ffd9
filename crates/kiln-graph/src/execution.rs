//! Running tasks and sequences against a graph.

use std::collections::HashSet;
use std::time::Instant;

use crate::graph::TaskGraph;
use crate::task::{TaskError, TaskKey};

/// Failure of a task run.
#[derive(Debug, thiserror::Error)]
pub enum RunError<K: TaskKey> {
    #[error("task '{0}' is not defined")]
    UnknownTask(K),

    #[error("task '{task}' failed: {source}")]
    Failed { task: K, source: TaskError },
}

impl<K: TaskKey> RunError<K> {
    /// The task whose body failed, or the unknown name.
    pub fn task(&self) -> K {
        match self {
            RunError::UnknownTask(task) | RunError::Failed { task, .. } => *task,
        }
    }
}

/// One top-level run over a graph.
///
/// Tasks completed within an execution are memoized: a task referenced by
/// several dependents, or listed again in a sequence, runs once.
pub struct Execution<'g, K: TaskKey, C> {
    graph: &'g TaskGraph<K, C>,
    completed: HashSet<K>,
    history: Vec<K>,
}

impl<'g, K: TaskKey, C> Execution<'g, K, C> {
    pub(crate) fn new(graph: &'g TaskGraph<K, C>) -> Self {
        Self {
            graph,
            completed: HashSet::new(),
            history: Vec::new(),
        }
    }

    /// Run `names` strictly in order, stopping at the first failure.
    ///
    /// Each step still has its own prerequisites satisfied first.
    pub fn run_sequence(&mut self, ctx: &C, names: &[K]) -> Result<(), RunError<K>> {
        names.iter().try_fold((), |(), &name| self.run_task(ctx, name))
    }

    /// Run a task after its prerequisites, unless it already completed.
    pub fn run_task(&mut self, ctx: &C, name: K) -> Result<(), RunError<K>> {
        if self.completed.contains(&name) {
            tracing::debug!("'{}' already completed", name);
            return Ok(());
        }

        self.run_prerequisites(ctx, name)?;
        self.run_body(ctx, name)
    }

    /// Run a task body again even if it already completed.
    ///
    /// Prerequisites that completed earlier in this execution are not
    /// repeated.
    pub fn rerun(&mut self, ctx: &C, name: K) -> Result<(), RunError<K>> {
        self.run_prerequisites(ctx, name)?;
        self.run_body(ctx, name)
    }

    /// Whether `name` completed within this execution.
    pub fn is_completed(&self, name: K) -> bool {
        self.completed.contains(&name)
    }

    /// Task bodies run so far, in the order they ran.
    pub fn history(&self) -> &[K] {
        &self.history
    }

    fn run_prerequisites(&mut self, ctx: &C, name: K) -> Result<(), RunError<K>> {
        let graph = self.graph;
        let node = graph.nodes.get(&name).ok_or(RunError::UnknownTask(name))?;

        for &prerequisite in &node.prerequisites {
            self.run_task(ctx, prerequisite)?;
        }

        Ok(())
    }

    fn run_body(&mut self, ctx: &C, name: K) -> Result<(), RunError<K>> {
        let graph = self.graph;
        let node = graph.nodes.get(&name).ok_or(RunError::UnknownTask(name))?;

        tracing::info!("Starting '{}'...", name);
        let start = Instant::now();
        self.history.push(name);

        match node.body.run(ctx) {
            Ok(()) => {
                self.completed.insert(name);
                tracing::info!("Finished '{}' after {}ms", name, start.elapsed().as_millis());
                Ok(())
            }
            Err(source) => {
                tracing::error!("'{}' errored after {}ms", name, start.elapsed().as_millis());
                Err(RunError::Failed { task: name, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    use crate::graph::TaskGraph;

    /// Records which bodies ran and fails the ones listed.
    #[derive(Default)]
    struct Recorder {
        ran: Mutex<Vec<&'static str>>,
        failing: Vec<&'static str>,
    }

    impl Recorder {
        fn failing(names: &[&'static str]) -> Self {
            Self {
                ran: Mutex::new(Vec::new()),
                failing: names.to_vec(),
            }
        }

        fn ran(&self) -> Vec<&'static str> {
            self.ran.lock().unwrap().clone()
        }
    }

    fn body(name: &'static str) -> impl Fn(&Recorder) -> Result<(), TaskError> + Send + Sync {
        move |rec: &Recorder| {
            rec.ran.lock().unwrap().push(name);
            if rec.failing.contains(&name) {
                return Err(format!("{name} broke").into());
            }
            Ok(())
        }
    }

    fn pipeline() -> TaskGraph<&'static str, Recorder> {
        let mut builder = TaskGraph::builder();
        for (name, prerequisites) in [
            ("clean", &[][..]),
            ("fileinclude", &["clean"][..]),
            ("htmlhint", &["fileinclude"][..]),
            ("sass", &["htmlhint"][..]),
            ("minify", &[][..]),
            ("copy:fonts", &[][..]),
            ("prettify", &["copy:fonts"][..]),
        ] {
            builder.register(name, prerequisites, body(name)).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn sequence_runs_each_task_once_in_order() {
        let graph = pipeline();
        let rec = Recorder::default();
        let mut exec = graph.execution();

        exec.run_sequence(
            &rec,
            &["clean", "fileinclude", "htmlhint", "sass", "minify", "copy:fonts", "prettify"],
        )
        .unwrap();

        assert_eq!(
            rec.ran(),
            vec!["clean", "fileinclude", "htmlhint", "sass", "minify", "copy:fonts", "prettify"]
        );
        assert_eq!(exec.history(), rec.ran().as_slice());
    }

    #[test]
    fn sequence_halts_at_first_failure() {
        let graph = pipeline();
        let rec = Recorder::failing(&["htmlhint"]);
        let mut exec = graph.execution();

        let err = exec
            .run_sequence(&rec, &["clean", "fileinclude", "htmlhint", "sass", "minify"])
            .unwrap_err();

        assert_eq!(err.task(), "htmlhint");
        assert_eq!(rec.ran(), vec!["clean", "fileinclude", "htmlhint"]);
        assert!(!exec.is_completed("htmlhint"));
    }

    #[test]
    fn prerequisites_run_before_body() {
        let graph = pipeline();
        let rec = Recorder::default();
        let mut exec = graph.execution();

        exec.run_task(&rec, "sass").unwrap();

        assert_eq!(rec.ran(), vec!["clean", "fileinclude", "htmlhint", "sass"]);
    }

    #[test]
    fn failed_prerequisite_blocks_dependent() {
        let graph = pipeline();
        let rec = Recorder::failing(&["fileinclude"]);
        let mut exec = graph.execution();

        let err = exec.run_task(&rec, "sass").unwrap_err();

        assert_eq!(err.task(), "fileinclude");
        assert_eq!(rec.ran(), vec!["clean", "fileinclude"]);
    }

    #[test]
    fn shared_prerequisite_runs_once() {
        let mut builder = TaskGraph::builder();
        builder
            .register("base", &[], body("base"))
            .unwrap()
            .register("left", &["base"], body("left"))
            .unwrap()
            .register("right", &["base"], body("right"))
            .unwrap()
            .register("top", &["left", "right"], body("top"))
            .unwrap();
        let graph = builder.build().unwrap();
        let rec = Recorder::default();

        graph.execution().run_task(&rec, "top").unwrap();

        assert_eq!(rec.ran(), vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn memoization_is_per_execution() {
        let graph = pipeline();
        let rec = Recorder::default();

        graph.execution().run_task(&rec, "fileinclude").unwrap();
        graph.execution().run_task(&rec, "fileinclude").unwrap();

        assert_eq!(
            rec.ran(),
            vec!["clean", "fileinclude", "clean", "fileinclude"]
        );
    }

    #[test]
    fn rerun_repeats_body_but_not_prerequisites() {
        let graph = pipeline();
        let rec = Recorder::default();
        let mut exec = graph.execution();

        exec.run_sequence(&rec, &["clean", "fileinclude", "sass"]).unwrap();
        exec.rerun(&rec, "sass").unwrap();

        assert_eq!(
            rec.ran(),
            vec!["clean", "fileinclude", "htmlhint", "sass", "sass"]
        );
    }

    #[test]
    fn unknown_task_is_reported() {
        let graph = pipeline();
        let rec = Recorder::default();

        let err = graph.execution().run_task(&rec, "deploy").unwrap_err();

        assert!(matches!(err, RunError::UnknownTask("deploy")));
        assert!(rec.ran().is_empty());
    }
}
