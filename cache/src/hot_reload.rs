//! # Hot Reload Invalidation
//!
//! Watches configuration files for changes and invalidates the matching
//! cache entries automatically.
//!
//! This is push-based and complements the pull-based staleness check in
//! the loader: the loader never depends on a watcher being present.

use crate::key::cache_key;
use cc_core::CacheBackend;
use errors::ConfigError;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration watch event.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The watcher is installed and running.
    Ready,

    /// Configuration file changed or was created
    Changed(PathBuf),

    /// Configuration file was removed
    Removed(PathBuf),

    /// Watcher error
    Error {
        path: PathBuf,
        error: String,
    },
}

/// Watch a configuration file for changes and emit watch events.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Monitors a configuration file using the `notify` crate and forwards
/// change/remove events over a tokio channel. Dropping the receiver
/// stops the watcher task.
///
/// ## Usage
/// ```rust,no_run
/// use cache::{watch_config, WatchEvent};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut rx = watch_config(std::path::Path::new("config.toml")).await?;
///     while let Some(event) = rx.recv().await {
///         match event {
///             WatchEvent::Changed(path) => println!("changed: {:?}", path),
///             WatchEvent::Removed(path) => println!("removed: {:?}", path),
///             _ => {}
///         }
///     }
///     Ok(())
/// }
/// ```
///
/// ## Event Types
/// - `Ready`: watcher installed
/// - `Changed`: file created or modified
/// - `Removed`: file deleted
/// - `Error`: watcher failure
pub async fn watch_config(
    config_path: &Path,
) -> Result<tokio::sync::mpsc::Receiver<WatchEvent>, ConfigError> {
    let config_path = config_path.to_path_buf();

    if !config_path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Config file not found: {:?}", config_path),
        )));
    }

    let (tx, rx) = tokio::sync::mpsc::channel(100);

    tokio::spawn(async move {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(100);
        // Held for the lifetime of the loop; dropping it unregisters
        // the OS watch.
        let _watcher = match install_watcher(&config_path, event_tx) {
            Ok(watcher) => watcher,
            Err(e) => {
                error!(path = %config_path.display(), error = %e, "failed to install file watcher");
                let _ = tx
                    .send(WatchEvent::Error {
                        path: config_path,
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        info!(path = %config_path.display(), "watching config file");
        let _ = tx.send(WatchEvent::Ready).await;

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!(path = %config_path.display(), "receiver dropped, stopping watcher");
                    break;
                }
                received = event_rx.recv() => {
                    match received {
                        Some(Ok(event)) => {
                            if !forward_event(&tx, &event).await {
                                break;
                            }
                        }
                        Some(Err(e)) => warn!(error = %e, "watch error"),
                        None => break,
                    }
                }
            }
        }
    });

    Ok(rx)
}

fn install_watcher(
    path: &Path,
    event_tx: tokio::sync::mpsc::Sender<Result<notify::Event, notify::Error>>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = event_tx.blocking_send(res);
        },
        notify::Config::default(),
    )?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Translate a filesystem notification into watch events, one per
/// affected path. Returns `false` once the receiver is gone.
async fn forward_event(tx: &tokio::sync::mpsc::Sender<WatchEvent>, event: &notify::Event) -> bool {
    for path in &event.paths {
        let watch_event = match &event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                info!(path = %path.display(), "config file updated");
                WatchEvent::Changed(path.clone())
            }
            EventKind::Remove(_) => {
                warn!(path = %path.display(), "config file removed");
                WatchEvent::Removed(path.clone())
            }
            other => {
                debug!(kind = ?other, "ignoring filesystem event");
                continue;
            }
        };
        if tx.send(watch_event).await.is_err() {
            return false;
        }
    }
    true
}

/// Watch a configuration file and drop its cache entry on change.
///
/// Derives the file's cache key with `app_root` exactly as the loader
/// does, so the next load after a change misses and reparses even in
/// environments that skip the staleness stat. Events are forwarded to
/// the returned receiver for observation.
pub async fn watch_and_invalidate(
    config_path: &Path,
    backend: Arc<dyn CacheBackend>,
    app_root: &Path,
) -> Result<tokio::sync::mpsc::Receiver<WatchEvent>, ConfigError> {
    let key = cache_key(config_path, app_root);
    let mut inner = watch_config(config_path).await?;
    let (tx, rx) = tokio::sync::mpsc::channel(100);

    tokio::spawn(async move {
        while let Some(event) = inner.recv().await {
            if matches!(event, WatchEvent::Changed(_) | WatchEvent::Removed(_)) {
                match backend.remove(&key) {
                    Ok(()) => debug!(key = %key, "cache entry invalidated"),
                    Err(e) => warn!(key = %key, error = %e, "cache invalidation failed"),
                }
            }
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}
