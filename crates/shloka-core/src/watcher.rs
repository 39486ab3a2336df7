//! File watcher for the corpus. Signals when the corpus changes so the index can be rebuilt.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};

const DEBOUNCE: Duration = Duration::from_millis(400);

/// Keeps the watch alive; dropping it stops watching.
pub struct CorpusWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    root: PathBuf,
}

impl CorpusWatcher {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Watches the corpus file or directory at `path` and calls `on_change` whenever
/// it changes (debounced).
pub fn watch_corpus(
    path: &Path,
    on_change: impl Fn() + Send + 'static,
) -> Result<CorpusWatcher, WatchError> {
    if !path.exists() {
        return Err(WatchError::NotFound(path.to_path_buf()));
    }
    let root = path.canonicalize().map_err(WatchError::Canonicalize)?;
    let mode = if root.is_dir() {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
        Ok(events) => {
            tracing::debug!(events = events.len(), "corpus changed");
            on_change();
        }
        Err(e) => tracing::warn!(error = %e, "watcher error"),
    })
    .map_err(|e| WatchError::Notify(e.to_string()))?;

    debouncer
        .watcher()
        .watch(&root, mode)
        .map_err(|e| WatchError::Watch(e.to_string()))?;

    tracing::info!(path = %root.display(), "watching corpus");
    Ok(CorpusWatcher {
        _debouncer: debouncer,
        root,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("corpus not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("watcher init: {0}")]
    Notify(String),
    #[error("watch failed: {0}")]
    Watch(String),
}
