//! State shared by every task body in a run.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use kiln_server::{DispatchTable, FileWatcher, ReloadHub};

use crate::config::SiteConfig;
use crate::ids::TaskId;

/// A running watcher and the table mapping its events to tasks.
pub struct ActiveWatch {
    _watcher: Option<FileWatcher>,
    pub(crate) events: mpsc::Receiver<Vec<PathBuf>>,
    pub(crate) table: DispatchTable<TaskId>,
}

impl ActiveWatch {
    pub fn new(
        watcher: FileWatcher,
        events: mpsc::Receiver<Vec<PathBuf>>,
        table: DispatchTable<TaskId>,
    ) -> Self {
        Self {
            _watcher: Some(watcher),
            events,
            table,
        }
    }

    /// Dispatch batches from any channel instead of a file watcher.
    pub fn from_channel(
        events: mpsc::Receiver<Vec<PathBuf>>,
        table: DispatchTable<TaskId>,
    ) -> Self {
        Self {
            _watcher: None,
            events,
            table,
        }
    }
}

/// Context passed to every task body.
pub struct TaskContext {
    config: Arc<SiteConfig>,
    reload: ReloadHub,
    watch: Mutex<Option<ActiveWatch>>,
}

impl TaskContext {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config: Arc::new(config),
            reload: ReloadHub::new(),
            watch: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Hub shared by every server started in this run.
    pub fn reload_hub(&self) -> &ReloadHub {
        &self.reload
    }

    /// Ask connected browsers to reload.
    pub fn notify_reload(&self) {
        self.reload.reload();
    }

    pub(crate) fn install_watch(&self, watch: ActiveWatch) {
        let mut slot = self.watch.lock().unwrap_or_else(|e| e.into_inner());
        if slot.replace(watch).is_some() {
            tracing::debug!("Replaced previous watcher");
        }
    }

    /// Take the watcher installed by `stream`, if any.
    pub fn take_watch(&self) -> Option<ActiveWatch> {
        self.watch
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}
