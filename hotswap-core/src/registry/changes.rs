//! Change queue consumer
//!
//! The watcher never calls into the registry. It pushes [`ChangeEvent`]s onto a
//! bounded channel; one consumer task drains it and hands each event to the
//! FIFO worker of its plugin. A worker applies its events one after another, so
//! events for one plugin keep their order and queue behind a reload in flight,
//! while different plugins proceed in parallel.
//!
//! A worker that sees no events for [`WORKER_IDLE`] is retired: its sender is
//! dropped, it drains what is queued and exits. The next worker for the same
//! plugin waits for it before applying anything.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::PluginRegistry;
use crate::events::ChangeEvent;

/// How long a plugin's worker stays around without events
const WORKER_IDLE: Duration = Duration::from_secs(30);

impl PluginRegistry {
    /// Start the consumer task and return the sending half of its queue.
    ///
    /// The consumer and its workers stop once every sender is dropped and the
    /// queued events are applied. Must be called within a tokio runtime.
    pub fn spawn_change_consumer(
        self: &Arc<Self>,
        capacity: usize,
    ) -> (mpsc::Sender<ChangeEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(consume(Arc::clone(self), rx));
        (tx, handle)
    }
}

struct Worker {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    handle: JoinHandle<()>,
    last_event: Instant,
}

#[derive(Default)]
struct Workers {
    active: HashMap<String, Worker>,
    /// Retired workers that may still be draining, by plugin
    retired: HashMap<String, JoinHandle<()>>,
}

impl Workers {
    fn dispatch(&mut self, registry: &Arc<PluginRegistry>, event: ChangeEvent) {
        let id = event.identifier.clone();

        let event = match self.active.get_mut(&id) {
            Some(worker) => match worker.tx.send(event) {
                Ok(()) => {
                    worker.last_event = Instant::now();
                    return;
                }
                Err(mpsc::error::SendError(event)) => {
                    tracing::warn!(plugin = %id, "Change worker gone, restarting");
                    event
                }
            },
            None => event,
        };

        let previous = self
            .active
            .remove(&id)
            .map(|worker| worker.handle)
            .or_else(|| self.retired.remove(&id));
        let worker = spawn_worker(Arc::clone(registry), id.clone(), previous);
        let _ = worker.tx.send(event);
        self.active.insert(id, worker);
    }

    fn retire_idle(&mut self, now: Instant) {
        self.retired.retain(|_, handle| !handle.is_finished());

        let idle: Vec<String> = self
            .active
            .iter()
            .filter(|(_, worker)| now.duration_since(worker.last_event) >= WORKER_IDLE)
            .map(|(id, _)| id.clone())
            .collect();

        for id in idle {
            if let Some(worker) = self.active.remove(&id) {
                tracing::debug!(plugin = %id, "Retiring idle change worker");
                self.retired.insert(id, worker.handle);
            }
        }
    }

    async fn join(self) {
        // Dropping the senders lets every worker drain and exit.
        let handles: Vec<_> = self
            .active
            .into_values()
            .map(|worker| worker.handle)
            .chain(self.retired.into_values())
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn consume(registry: Arc<PluginRegistry>, mut rx: mpsc::Receiver<ChangeEvent>) {
    let mut workers = Workers::default();
    let mut sweep = tokio::time::interval(WORKER_IDLE);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => workers.dispatch(&registry, event),
                None => break,
            },
            _ = sweep.tick() => workers.retire_idle(Instant::now()),
        }
    }

    workers.join().await;
    tracing::debug!("Change queue closed");
}

fn spawn_worker(
    registry: Arc<PluginRegistry>,
    id: String,
    previous: Option<JoinHandle<()>>,
) -> Worker {
    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let handle = tokio::spawn(async move {
        if let Some(previous) = previous {
            let _ = previous.await;
        }
        while let Some(event) = rx.recv().await {
            tracing::debug!(plugin = %id, kind = ?event.kind, "Applying change");
            // Failures are logged by the registry.
            let _ = registry.handle_change(&event).await;
        }
    });
    Worker {
        tx,
        handle,
        last_event: Instant::now(),
    }
}
