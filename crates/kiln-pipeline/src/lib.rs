//! Build pipeline for kiln sites.
//!
//! Defines the pipeline's tasks (page includes, markup lint, stylesheet
//! compilation, bundling, image optimization, beautification, servers and
//! watchers), wires them into a task graph and runs the composite entry
//! points against it.

pub mod assets;
pub mod bundle;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod ids;
pub mod images;
pub mod include;
pub mod lint;
pub mod markup;
pub mod prettify;
pub mod session;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, SiteConfig};
pub use context::{ActiveWatch, TaskContext};
pub use error::PipelineError;
pub use ids::{Entry, TaskId, UnknownTask};
pub use lint::LintViolation;
pub use session::{
    hold, is_serving, run_entry, watch_loop, PipelineExecution, PipelineGraph,
};
pub use tasks::{pipeline_graph, watch_table};
