//! Per-key debounce windows
//!
//! The first event for a key opens a fixed window. Repeats inside it are
//! absorbed, and the event is released once when the window closes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::events::ChangeEvent;

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<ChangeEvent, (Instant, u64)>,
    opened: u64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            opened: 0,
        }
    }

    /// Record an event. Returns `true` if it opened a new window.
    pub fn observe(&mut self, event: ChangeEvent, now: Instant) -> bool {
        if self.pending.contains_key(&event) {
            return false;
        }
        self.pending.insert(event, (now + self.window, self.opened));
        self.opened += 1;
        true
    }

    /// Earliest closing time of any open window
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(deadline, _)| *deadline).min()
    }

    /// Remove and return the events whose window has closed, in window-open order
    pub fn drain_due(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let mut due: Vec<(ChangeEvent, u64)> = Vec::new();
        self.pending.retain(|event, (deadline, seq)| {
            if *deadline <= now {
                due.push((event.clone(), *seq));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(_, seq)| *seq);
        due.into_iter().map(|(event, _)| event).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
