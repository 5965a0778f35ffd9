//! Task graph registration and validation.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::execution::Execution;
use crate::task::{Task, TaskKey};

/// Configuration errors detected while defining the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate task: {0}")]
    DuplicateTask(String),

    #[error("task '{task}' depends on undefined task '{prerequisite}'")]
    MissingPrerequisite { task: String, prerequisite: String },

    #[error("cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// A registered task: its ordered prerequisites and its body.
pub(crate) struct Node<K, C> {
    pub(crate) prerequisites: Vec<K>,
    pub(crate) body: Box<dyn Task<C>>,
}

/// Collects task definitions before they are validated.
pub struct TaskGraphBuilder<K: TaskKey, C> {
    nodes: HashMap<K, Node<K, C>>,
    order: Vec<K>,
}

impl<K: TaskKey, C> TaskGraphBuilder<K, C> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a task under `name`.
    ///
    /// Prerequisites may name tasks that are registered later; they are
    /// resolved by [`TaskGraphBuilder::build`].
    pub fn register(
        &mut self,
        name: K,
        prerequisites: &[K],
        body: impl Task<C> + 'static,
    ) -> Result<&mut Self, GraphError> {
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateTask(name.to_string()));
        }

        self.nodes.insert(
            name,
            Node {
                prerequisites: prerequisites.to_vec(),
                body: Box::new(body),
            },
        );
        self.order.push(name);

        Ok(self)
    }

    /// Validate the definitions and freeze them into a graph.
    pub fn build(self) -> Result<TaskGraph<K, C>, GraphError> {
        for name in &self.order {
            for prerequisite in &self.nodes[name].prerequisites {
                if !self.nodes.contains_key(prerequisite) {
                    return Err(GraphError::MissingPrerequisite {
                        task: name.to_string(),
                        prerequisite: prerequisite.to_string(),
                    });
                }
            }
        }

        let graph = TaskGraph {
            nodes: self.nodes,
            order: self.order,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphError::Cycle(
                cycle.iter().map(ToString::to_string).collect(),
            ));
        }

        Ok(graph)
    }
}

impl<K: TaskKey, C> Default for TaskGraphBuilder<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, immutable task graph.
pub struct TaskGraph<K: TaskKey, C> {
    pub(crate) nodes: HashMap<K, Node<K, C>>,
    order: Vec<K>,
}

impl<K: TaskKey, C> TaskGraph<K, C> {
    /// Start a builder.
    pub fn builder() -> TaskGraphBuilder<K, C> {
        TaskGraphBuilder::new()
    }

    /// Task names in registration order.
    pub fn names(&self) -> &[K] {
        &self.order
    }

    /// Whether a task is defined.
    pub fn contains(&self, name: K) -> bool {
        self.nodes.contains_key(&name)
    }

    /// Declared prerequisites of a task.
    pub fn prerequisites(&self, name: K) -> Option<&[K]> {
        self.nodes.get(&name).map(|n| n.prerequisites.as_slice())
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Begin a fresh execution. Completion is memoized per execution.
    pub fn execution(&self) -> Execution<'_, K, C> {
        Execution::new(self)
    }

    /// Depth-first search for a cycle, returning its path if one exists.
    fn find_cycle(&self) -> Option<Vec<K>> {
        let mut done: HashSet<K> = HashSet::new();

        for &start in &self.order {
            if done.contains(&start) {
                continue;
            }

            let mut path: Vec<K> = Vec::new();
            if let Some(cycle) = self.visit(start, &mut path, &mut done) {
                return Some(cycle);
            }
        }

        None
    }

    fn visit(&self, name: K, path: &mut Vec<K>, done: &mut HashSet<K>) -> Option<Vec<K>> {
        if let Some(pos) = path.iter().position(|n| *n == name) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(name);
            return Some(cycle);
        }
        if done.contains(&name) {
            return None;
        }

        path.push(name);
        for &prerequisite in &self.nodes[&name].prerequisites {
            if let Some(cycle) = self.visit(prerequisite, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(name);

        None
    }
}

impl<K: TaskKey, C> fmt::Debug for TaskGraph<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in &self.order {
            map.entry(name, &self.nodes[name].prerequisites);
        }
        map.finish()
    }
}
