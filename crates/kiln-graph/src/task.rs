//! Task bodies and task keys.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Error returned by a task body.
///
/// Boxed so every body can surface its own typed error; callers can
/// `downcast_ref` to inspect it.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A key naming a task in the graph.
pub trait TaskKey: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> TaskKey for T where T: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// A unit of work run against a shared context.
pub trait Task<C>: Send + Sync {
    /// Run the task body. Only success or failure is reported.
    fn run(&self, ctx: &C) -> Result<(), TaskError>;
}

impl<C, F> Task<C> for F
where
    F: Fn(&C) -> Result<(), TaskError> + Send + Sync,
{
    fn run(&self, ctx: &C) -> Result<(), TaskError> {
        self(ctx)
    }
}
