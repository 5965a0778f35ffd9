//! File watching and watch-to-task dispatch.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use globset::{GlobBuilder, GlobMatcher};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use crate::server::ServerError;

/// File watcher that reports changed paths in coalesced batches.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively.
    ///
    /// Changed paths are reported relative to `base`. Events arriving within
    /// `debounce` of each other are merged into one batch with duplicates
    /// removed.
    pub fn new(
        base: &Path,
        paths: &[PathBuf],
        debounce: Duration,
    ) -> Result<(Self, async_mpsc::Receiver<Vec<PathBuf>>), ServerError> {
        let base = base
            .canonicalize()
            .map_err(|e| ServerError::WatchError(format!("{}: {}", base.display(), e)))?;

        let (sync_tx, sync_rx) = mpsc::channel::<notify::Event>();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| ServerError::WatchError(e.to_string()))?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(|e| ServerError::WatchError(e.to_string()))?;
                tracing::debug!("Watching {}", path.display());
            } else {
                tracing::warn!("Not watching missing directory {}", path.display());
            }
        }

        std::thread::spawn(move || {
            while let Ok(first) = sync_rx.recv() {
                let mut batch = Vec::new();
                collect_paths(&base, first, &mut batch);

                // Keep merging until the tree has been quiet for a full window
                while let Ok(next) = sync_rx.recv_timeout(debounce) {
                    collect_paths(&base, next, &mut batch);
                }

                if batch.is_empty() {
                    continue;
                }
                if async_tx.blocking_send(batch).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Add the paths of a content-changing event to `batch`.
fn collect_paths(base: &Path, event: notify::Event, batch: &mut Vec<PathBuf>) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    for path in event.paths {
        let relative = match path.canonicalize() {
            Ok(canonical) => canonical.strip_prefix(base).map(Path::to_path_buf).ok(),
            // Removed files can no longer be canonicalized
            Err(_) => path.strip_prefix(base).map(Path::to_path_buf).ok(),
        };

        let relative = relative.unwrap_or(path);
        if !batch.contains(&relative) {
            batch.push(relative);
        }
    }
}

/// A glob that triggers a task.
#[derive(Debug, Clone)]
struct WatchRule<T> {
    pattern: String,
    matcher: GlobMatcher,
    task: T,
}

/// Maps changed paths to the tasks they trigger.
#[derive(Debug, Clone)]
pub struct DispatchTable<T> {
    rules: Vec<WatchRule<T>>,
}

impl<T: Copy + PartialEq> DispatchTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Re-run `task` when a path matching `pattern` changes.
    ///
    /// `*` does not cross directory separators; use `**` for that.
    pub fn on(mut self, pattern: &str, task: T) -> Result<Self, ServerError> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ServerError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        self.rules.push(WatchRule {
            pattern: pattern.to_string(),
            matcher,
            task,
        });

        Ok(self)
    }

    /// Tasks triggered by a change to `path`.
    pub fn tasks_for<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = T> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.matcher.is_match(path))
            .map(|rule| rule.task)
    }

    /// Tasks triggered by a batch of changes, each once, in first-seen order.
    pub fn coalesce<'p, I>(&self, paths: I) -> Vec<T>
    where
        I: IntoIterator<Item = &'p Path>,
    {
        let mut tasks = Vec::new();
        for path in paths {
            for task in self.tasks_for(path) {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
        }
        tasks
    }

    /// Registered patterns and their tasks.
    pub fn rules(&self) -> impl Iterator<Item = (&str, T)> {
        self.rules.iter().map(|r| (r.pattern.as_str(), r.task))
    }
}

impl<T: Copy + PartialEq> Default for DispatchTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Job {
        Markup,
        Styles,
    }

    fn table() -> DispatchTable<Job> {
        DispatchTable::new()
            .on("src/views/**/*.html", Job::Markup)
            .unwrap()
            .on("src/styles/**/*.scss", Job::Styles)
            .unwrap()
    }

    #[test]
    fn each_rule_is_scoped_to_its_pattern() {
        let table = table();

        let styles: Vec<_> = table.tasks_for(Path::new("src/styles/base/_vars.scss")).collect();
        let markup: Vec<_> = table.tasks_for(Path::new("src/views/pages/index.html")).collect();
        let neither: Vec<_> = table.tasks_for(Path::new("src/index.html")).collect();

        assert_eq!(styles, vec![Job::Styles]);
        assert_eq!(markup, vec![Job::Markup]);
        assert!(neither.is_empty());
    }

    #[test]
    fn coalesces_repeated_changes() {
        let table = table();
        let paths = [
            PathBuf::from("src/styles/main.scss"),
            PathBuf::from("src/styles/main.scss"),
            PathBuf::from("src/styles/_mixins.scss"),
        ];

        let tasks = table.coalesce(paths.iter().map(PathBuf::as_path));

        assert_eq!(tasks, vec![Job::Styles]);
    }

    #[test]
    fn rejects_invalid_patterns() {
        let err = DispatchTable::new().on("src/[", Job::Markup).unwrap_err();
        assert!(matches!(err, ServerError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();

        let (watcher, mut rx) =
            FileWatcher::new(temp.path(), &[styles.clone()], Duration::from_millis(50)).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(styles.join("main.scss"), "body { color: red; }").unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        let batch = batch.expect("timeout waiting for file watch event");
        let batch = batch.expect("channel should not be closed");
        assert!(batch.contains(&PathBuf::from("src/styles/main.scss")));
    }
}
