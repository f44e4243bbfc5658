//! Trailing-edge debouncer with a maximum wait and an explicit flush.
//!
//! A [`Debouncer`] holds at most one pending "emit" ticket. Every
//! [`enqueue`](Debouncer::enqueue) pushes the deadline out by `wait`, but
//! never past `max_wait` from the first request of the burst, so a
//! continuous stream of requests still emits once per `max_wait`.
//! [`flush`](Debouncer::flush) cancels the timer and runs the callback on
//! the calling thread if a ticket is pending.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Callback invoked when the debounced ticket fires.
pub type DebouncedFn = Arc<dyn Fn() + Send + Sync>;

/// Coalesces repeated requests into at most one callback per window.
///
/// Requires a Tokio runtime for the timer; without one, `enqueue` runs the
/// callback immediately.
pub struct Debouncer {
    inner: Arc<Inner>,
}

struct Inner {
    wait: Duration,
    max_wait: Duration,
    callback: DebouncedFn,
    state: Mutex<Ticket>,
}

/// The single pending emission, if any.
#[derive(Default)]
struct Ticket {
    pending_since: Option<Instant>,
    last_request: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl Ticket {
    fn deadline(&self, wait: Duration, max_wait: Duration) -> Option<Instant> {
        let since = self.pending_since?;
        let last = self.last_request.unwrap_or(since);
        Some((last + wait).min(since + max_wait))
    }
}

impl Debouncer {
    /// Create a debouncer with separate `wait` and `max_wait` durations.
    pub fn new(wait: Duration, max_wait: Duration, callback: DebouncedFn) -> Self {
        Self {
            inner: Arc::new(Inner {
                wait,
                max_wait: max_wait.max(wait),
                callback,
                state: Mutex::new(Ticket::default()),
            }),
        }
    }

    /// Create a debouncer whose `max_wait` equals its `wait`.
    pub fn with_window(window: Duration, callback: DebouncedFn) -> Self {
        Self::new(window, window, callback)
    }

    /// Schedule (or reschedule) the callback.
    pub fn enqueue(&self) {
        let now = Instant::now();
        let mut ticket = self.inner.lock();
        if ticket.pending_since.is_none() {
            ticket.pending_since = Some(now);
        }
        ticket.last_request = Some(now);

        if ticket.timer.is_some() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                ticket.timer = Some(handle.spawn(inner.run_timer()));
            }
            Err(_) => {
                tracing::warn!("No async runtime for debounced callback, running inline");
                *ticket = Ticket::default();
                drop(ticket);
                (self.inner.callback)();
            }
        }
    }

    /// Run the pending callback now, if any, and cancel its timer.
    ///
    /// Returns `true` when a pending callback was executed.
    pub fn flush(&self) -> bool {
        let mut ticket = self.inner.lock();
        if ticket.pending_since.is_none() {
            return false;
        }
        if let Some(timer) = ticket.timer.take() {
            timer.abort();
        }
        *ticket = Ticket::default();
        drop(ticket);

        (self.inner.callback)();
        true
    }

    /// Drop the pending callback without running it.
    pub fn cancel(&self) {
        let mut ticket = self.inner.lock();
        if let Some(timer) = ticket.timer.take() {
            timer.abort();
        }
        *ticket = Ticket::default();
    }

    /// Whether a callback is currently scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending_since.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Ticket> {
        // A poisoned ticket only means a callback panicked; the state
        // itself is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Timer task: sleep until the current deadline, re-checking it after
    /// every wake-up because `enqueue` may have moved it.
    async fn run_timer(self: Arc<Self>) {
        loop {
            let deadline = match self.lock().deadline(self.wait, self.max_wait) {
                Some(deadline) => deadline,
                None => return,
            };

            tokio::time::sleep_until(deadline).await;

            let mut ticket = self.lock();
            match ticket.deadline(self.wait, self.max_wait) {
                None => return,
                Some(deadline) if Instant::now() >= deadline => {
                    *ticket = Ticket::default();
                    drop(ticket);
                    (self.callback)();
                    return;
                }
                Some(_) => continue,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
