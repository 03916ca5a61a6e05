use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::machine::AnswerCapture;

/// Sessions untouched for this long are treated as abandoned.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    capture: AnswerCapture,
    last_touched: Instant,
}

/// In-process registry of live capture sessions.
///
/// The lock is only ever taken inside synchronous sections, so it is never
/// held across an `.await`. A browser that goes away without closing its
/// session leaves it idle; idle sessions are swept on `open` and by
/// `sweep_idle`.
#[derive(Clone)]
pub struct CaptureSessions {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    idle_timeout: Duration,
}

impl Default for CaptureSessions {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl CaptureSessions {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>) -> usize {
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_touched) < self.idle_timeout);
        before - sessions.len()
    }

    pub fn open(&self, capture: AnswerCapture) -> Uuid {
        let id = capture.session_id;
        let mut sessions = self.lock();
        let evicted = self.evict_idle(&mut sessions);
        if evicted > 0 {
            debug!("Evicted {evicted} idle capture session(s)");
        }
        sessions.insert(
            id,
            Entry {
                capture,
                last_touched: Instant::now(),
            },
        );
        debug!("Opened capture session {id}");
        id
    }

    /// Runs `f` against a live session and marks it as recently used. `None`
    /// when the session is gone.
    pub fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut AnswerCapture) -> R) -> Option<R> {
        let mut sessions = self.lock();
        sessions.get_mut(&id).map(|entry| {
            entry.last_touched = Instant::now();
            f(&mut entry.capture)
        })
    }

    pub fn close(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!("Closed capture session {id}");
        }
        removed
    }

    /// Drops every session idle for longer than the timeout. Returns how many
    /// were removed.
    pub fn sweep_idle(&self) -> usize {
        let mut sessions = self.lock();
        let evicted = self.evict_idle(&mut sessions);
        if evicted > 0 {
            info!(
                "Swept {evicted} idle capture session(s), {} still live",
                sessions.len()
            );
        }
        evicted
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Sweeps idle sessions every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                sessions.sweep_idle();
            }
        })
    }
}
