//! State change coordinator (debounced notifier)
//!
//! Components report mutations with `notify_changed(id)`. The coordinator
//! records the id in a pending set and (re)arms a debounce deadline. When the
//! deadline passes with no further notifications, a single "changes ready"
//! signal goes out to every subscriber.
//!
//! ```text
//!  notify(a) notify(b) notify(a)                      ChangesReady
//!     │         │         │                                │
//!  ───┴─────────┴─────────┴──────────[ debounce ]──────────┴──▶ time
//!     pending = {a, b}   deadline keeps moving right
//! ```
//!
//! The pending set is NOT cleared when the signal fires. The renderer drains
//! it with `take_pending()`, which reads and clears under one lock, so a
//! notification racing with the drain lands in the next batch and re-arms
//! the timer instead of being lost.
//!
//! All methods are callable from any thread. Only construction needs a Tokio
//! runtime (it spawns the debounce task).

use crate::tui::traits::ComponentId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default debounce window (roughly one 60Hz frame)
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(16);

/// Capacity of the changes-ready broadcast; slow receivers only ever need the latest
const READY_CHANNEL_CAPACITY: usize = 16;

#[derive(Default)]
struct PendingState {
    /// component id -> last notification time
    changes: HashMap<ComponentId, Instant>,
    /// When the debounce timer should fire, if armed
    deadline: Option<Instant>,
}

struct Shared {
    state: Mutex<PendingState>,
    wake: Notify,
    ready_tx: broadcast::Sender<()>,
}

impl Shared {
    fn fire(&self) {
        // No receivers is fine: nobody is waiting for a frame yet
        let _ = self.ready_tx.send(());
    }
}

/// Debounced, thread-safe change notifier shared by all components
pub struct StateCoordinator {
    shared: Arc<Shared>,
    debounce: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StateCoordinator {
    /// Create a coordinator and spawn its debounce task on the current runtime
    pub fn new(debounce: Duration) -> Arc<Self> {
        let (ready_tx, _) = broadcast::channel(READY_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(PendingState::default()),
            wake: Notify::new(),
            ready_tx,
        });

        let task = tokio::spawn(debounce_loop(Arc::clone(&shared)));

        Arc::new(Self {
            shared,
            debounce,
            task: Mutex::new(Some(task)),
        })
    }

    /// Configured debounce window
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record a change for `id` and (re)arm the debounce timer
    pub fn notify_changed(&self, id: ComponentId) {
        let now = Instant::now();
        {
            let mut state = self.shared.state.lock();
            state.changes.insert(id, now);
            state.deadline = Some(now + self.debounce);
        }
        self.shared.wake.notify_one();
    }

    /// Subscribe to the changes-ready signal
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shared.ready_tx.subscribe()
    }

    pub fn has_pending(&self) -> bool {
        !self.shared.state.lock().changes.is_empty()
    }

    pub fn has_pending_for(&self, id: ComponentId) -> bool {
        self.shared.state.lock().changes.contains_key(&id)
    }

    /// Number of distinct components with pending changes
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().changes.len()
    }

    /// Cancel the debounce timer and fire changes-ready immediately
    pub fn flush_pending(&self) {
        self.shared.state.lock().deadline = None;
        self.shared.fire();
    }

    /// Drop all pending changes (the timer stays armed if it was)
    pub fn clear_pending(&self) {
        self.shared.state.lock().changes.clear();
    }

    /// Read and clear the pending set atomically
    pub fn take_pending(&self) -> Vec<ComponentId> {
        let mut state = self.shared.state.lock();
        state.changes.drain().map(|(id, _)| id).collect()
    }

    /// Clear pending changes and disarm the timer
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        state.changes.clear();
        state.deadline = None;
    }

    /// Stop the debounce task. Idempotent.
    pub fn shutdown(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.reset();
    }
}

impl Drop for StateCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn debounce_loop(shared: Arc<Shared>) {
    loop {
        shared.wake.notified().await;

        // Keep sleeping while notifications push the deadline further out
        loop {
            let deadline = match shared.state.lock().deadline {
                Some(d) => d,
                None => break,
            };

            tokio::time::sleep_until(deadline).await;

            let fire = {
                let mut state = shared.state.lock();
                match state.deadline {
                    Some(d) if d <= Instant::now() => {
                        state.deadline = None;
                        true
                    }
                    Some(_) => false,
                    None => break,
                }
            };

            if fire {
                tracing::trace!("Debounce elapsed, signalling changes ready");
                shared.fire();
                break;
            }
        }
    }
}
