//! Task graph for kiln build pipelines.
//!
//! Tasks are registered under a unique key with an ordered list of
//! prerequisites. A frozen [`TaskGraph`] is validated (no duplicates, no
//! dangling prerequisites, no cycles) before anything runs, and an
//! [`Execution`] runs tasks and explicit sequences against it.

pub mod execution;
pub mod graph;
pub mod task;

pub use execution::{Execution, RunError};
pub use graph::{GraphError, TaskGraph, TaskGraphBuilder};
pub use task::{Task, TaskError, TaskKey};
