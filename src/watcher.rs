//! Reloading the program document when it changes on disk.
//!
//! `save_document` writes a hidden temp file and renames it over the
//! document, so a save shows up as a rename (or a create) of the document's
//! name inside its directory. Hand edits show up as data writes. Anything
//! else in the directory is ignored.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};

/// Configuration for file watching.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Window after the first change in which further changes are folded
    /// into the same reload (default: 2 seconds).
    pub debounce_duration: Duration,
    /// Number of reload attempts per change (default: 3).
    pub retry_attempts: u32,
    /// Delay between reload attempts (default: 500ms).
    pub retry_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_secs(2),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("Watch path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// How the document changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentChange {
    /// A new file took the document's name (atomic save or recreate).
    Replaced,
    /// The document's contents were written in place.
    Written,
}

/// Maps directory events onto the document's name.
struct DocumentEvents {
    file_name: OsString,
}

impl DocumentEvents {
    fn new(document: &Path) -> Option<Self> {
        document.file_name().map(|name| Self {
            file_name: name.to_owned(),
        })
    }

    fn is_document(&self, path: &Path) -> bool {
        path.file_name() == Some(self.file_name.as_os_str())
    }

    /// The change an event makes to the document, if any.
    ///
    /// Renames count only when the document is the destination. Removals
    /// and renames away are skipped: a reload would find no file, and the
    /// save that follows brings its own event.
    fn classify(&self, event: &Event) -> Option<DocumentChange> {
        match event.kind {
            EventKind::Create(_) => self.any_path(event).then_some(DocumentChange::Replaced),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                self.any_path(event).then_some(DocumentChange::Replaced)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
                .paths
                .last()
                .filter(|to| self.is_document(to))
                .map(|_| DocumentChange::Replaced),
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
                self.any_path(event).then_some(DocumentChange::Written)
            }
            _ => None,
        }
    }

    fn any_path(&self, event: &Event) -> bool {
        event.paths.iter().any(|p| self.is_document(p))
    }
}

/// Changes gathered since the last reload, due one window after the first.
struct PendingReload {
    window: Duration,
    due: Option<Instant>,
    changes: Vec<DocumentChange>,
}

impl PendingReload {
    fn new(window: Duration) -> Self {
        Self {
            window,
            due: None,
            changes: Vec::new(),
        }
    }

    fn record(&mut self, change: DocumentChange, now: Instant) {
        self.due.get_or_insert(now + self.window);
        self.changes.push(change);
    }

    fn due(&self) -> Option<Instant> {
        self.due
    }

    fn take(&mut self) -> Vec<DocumentChange> {
        self.due = None;
        std::mem::take(&mut self.changes)
    }
}

/// Watches the document and calls `on_change` once per burst of changes.
///
/// The parent directory is watched, since saves replace the file by
/// rename. Runs until the event channel closes; nothing outlives the call.
pub async fn watch_file<F>(
    path: impl AsRef<Path>,
    config: WatcherConfig,
    mut on_change: F,
) -> Result<(), WatcherError>
where
    F: FnMut(),
{
    let path = path.as_ref();
    let document = path
        .canonicalize()
        .map_err(|_| WatcherError::PathNotFound(path.to_path_buf()))?;
    let dir = match document.parent() {
        Some(dir) => dir.to_path_buf(),
        None => return Err(WatcherError::PathNotFound(document)),
    };
    let events =
        DocumentEvents::new(&document).ok_or_else(|| WatcherError::PathNotFound(document.clone()))?;

    log::info!("Watching document: {}", document.display());

    let (tx, mut rx) = mpsc::channel::<Event>(100);
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            // A full channel means a reload is already pending
            Ok(event) => {
                let _ = tx.try_send(event);
            }
            Err(e) => log::warn!("Watch error: {}", e),
        },
        notify::Config::default(),
    )?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    let mut pending = PendingReload::new(config.debounce_duration);
    loop {
        let next = match pending.due() {
            Some(due) => match timeout_at(due, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    let changes = pending.take();
                    log::info!("Document changed ({:?}), reloading", changes);
                    on_change();
                    continue;
                }
            },
            None => rx.recv().await,
        };

        let Some(event) = next else {
            return Err(WatcherError::ChannelClosed);
        };
        if let Some(change) = events.classify(&event) {
            log::debug!("Document event {:?} -> {:?}", event.kind, change);
            pending.record(change, Instant::now());
        }
    }
}

/// Runs `load` until it succeeds, up to `config.retry_attempts` times.
///
/// Returns `None` after logging the last error if every attempt fails.
pub async fn reload_with_retry<T, E, F>(config: &WatcherConfig, mut load: F) -> Option<T>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    for attempt in 1..=config.retry_attempts {
        match load() {
            Ok(value) => return Some(value),
            Err(e) if attempt == config.retry_attempts => {
                log::error!("Giving up on reload after {} attempts: {}", attempt, e);
            }
            Err(e) => {
                log::warn!("Reload attempt {} failed: {}", attempt, e);
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }
    None
}
