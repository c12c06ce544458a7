//! Tokio Timer Source
//!
//! [`Scheduler`] implementation that runs each callback in its own tokio task
//! and keeps every pending task in an arena so they can all be aborted.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::{Scheduler, TimerCallback, TimerId};
use crate::error::{Result, StateError};

/// Timer arena backed by a tokio runtime.
pub struct TokioTimers {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<TimerId, JoinHandle<()>>>>,
}

impl TokioTimers {
    /// Creates timers that spawn onto `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates timers on the runtime the caller is running in.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| StateError::TimerRuntime(e.to_string()))
    }
}

impl Scheduler for TokioTimers {
    fn schedule(&self, delay_ms: u64, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let tasks = self.tasks.clone();

        // Held across spawn so the task cannot look itself up before it is registered
        let mut arena = self.tasks.lock();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            // A cancelled timer has already been taken out of the arena
            let pending = tasks.lock().remove(&id).is_some();
            if pending {
                callback();
            }
        });
        arena.insert(id, handle);

        debug!(timer = %id, delay_ms, "Timer scheduled");
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.tasks.lock().remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_all(&self) -> usize {
        let drained: Vec<JoinHandle<()>> = self.tasks.lock().drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.abort();
        }
        drained.len()
    }

    fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl fmt::Debug for TokioTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioTimers")
            .field("pending", &self.pending())
            .finish()
    }
}
