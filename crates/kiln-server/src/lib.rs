//! Static file servers with live reload for kiln.
//!
//! Serves one or more root directories with a fallback document, pushes
//! reload notifications to connected browsers over a WebSocket, and maps
//! file system changes to the tasks that should re-run.

pub mod livereload;
pub mod server;
pub mod watcher;

pub use livereload::{
    client_script, inject_client, ReloadHub, ReloadMessage, LIVERELOAD_PATH,
    LIVERELOAD_SCRIPT_PATH,
};
pub use server::{resolve_path, ServerConfig, ServerError, StaticServer};
pub use watcher::{DispatchTable, FileWatcher};
