//! PluginWatcher - turns filesystem notifications under the plugin root into
//! debounced change events
//!
//! notify delivers on its own thread. The callback does nothing but
//! `blocking_send` the raw event into a bounded channel; classification and
//! debouncing run in a tokio task, and the result is pushed onto the
//! registry's change queue.

mod classify;
mod debounce;

pub use classify::{IGNORED_DIRS, changes, classify};
pub use debounce::Debouncer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{RegistryError, Result};
use crate::events::ChangeEvent;
use crate::registry::PluginRegistry;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Configuration for [`PluginWatcher`]
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Repeats of a `(plugin, kind)` change within this window collapse into one
    pub debounce: Duration,
    /// Capacity of the notification and change queues
    pub queue_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            queue_capacity: 256,
        }
    }
}

/// Watches a plugin root until dropped
pub struct PluginWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl PluginWatcher {
    /// Watch the registry's plugin root and feed its change queue.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(registry: &Arc<PluginRegistry>, config: WatcherConfig) -> Result<Self> {
        let (sink, _consumer) = registry.spawn_change_consumer(config.queue_capacity);
        Self::start_with_sink(registry.plugin_root(), sink, config)
    }

    /// Watch `root` and send debounced events to `sink`.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_with_sink(
        root: &Path,
        sink: mpsc::Sender<ChangeEvent>,
        config: WatcherConfig,
    ) -> Result<Self> {
        // notify reports canonical paths on some platforms
        let root = root.canonicalize().map_err(|e| RegistryError::io(root, e))?;

        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>(config.queue_capacity.max(1));
        let mut watcher = recommended_watcher(move |event| {
            // Runs on the notify thread
            let _ = tx.blocking_send(event);
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        tracing::info!(
            root = %root.display(),
            debounce_ms = config.debounce.as_millis() as u64,
            "Watching plugin root"
        );

        let task = tokio::spawn(debounce_loop(root.clone(), rx, sink, config.debounce));

        Ok(Self {
            root,
            _watcher: watcher,
            task,
        })
    }

    /// Canonical root being watched
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for PluginWatcher {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(root = %self.root.display(), "Stopped watching plugin root");
    }
}

async fn debounce_loop(
    root: PathBuf,
    mut rx: mpsc::Receiver<notify::Result<notify::Event>>,
    sink: mpsc::Sender<ChangeEvent>,
    window: Duration,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let deadline = debouncer.next_deadline();

        tokio::select! {
            received = rx.recv() => match received {
                Some(Ok(event)) => {
                    for change in changes(&root, &event) {
                        let plugin = change.identifier.clone();
                        let kind = change.kind;
                        if debouncer.observe(change, Instant::now()) {
                            tracing::debug!(plugin = %plugin, ?kind, "Change detected, debouncing");
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "File watch error");
                }
                None => break,
            },
            _ = wait_until(deadline) => {
                for change in debouncer.drain_due(Instant::now()) {
                    tracing::debug!(plugin = %change.identifier, kind = ?change.kind, "Debounce complete");
                    if sink.send(change).await.is_err() {
                        tracing::debug!("Change queue closed, stopping watcher");
                        return;
                    }
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{EventKind, ModifyKind};
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_debounce_loop_collapses_burst() {
        let root = PathBuf::from("/plugins");
        let (raw_tx, raw_rx) = mpsc::channel(16);
        let (sink, mut changes_rx) = mpsc::channel(16);
        let task = tokio::spawn(debounce_loop(
            root.clone(),
            raw_rx,
            sink,
            Duration::from_secs(1),
        ));

        let modify = || {
            Ok(notify::Event::new(EventKind::Modify(ModifyKind::Any))
                .add_path(root.join("echo/config.json")))
        };
        raw_tx.send(modify()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        raw_tx.send(modify()).await.unwrap();

        let first = changes_rx.recv().await.unwrap();
        assert_eq!(first, ChangeEvent::config("echo"));

        drop(raw_tx);
        task.await.unwrap();
        assert!(changes_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_start_on_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let (sink, _rx) = mpsc::channel(1);
        let result = PluginWatcher::start_with_sink(
            &dir.path().join("missing"),
            sink,
            WatcherConfig::default(),
        );
        assert!(matches!(result, Err(RegistryError::Io { .. })));
    }
}
