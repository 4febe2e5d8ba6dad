//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;

/// A token for cooperative cancellation of one orchestration call.
///
/// Cancellation is advisory. Handlers poll [`is_cancelled`](Self::is_cancelled)
/// or await [`cancelled`](Self::cancelled); nothing is interrupted forcibly.
/// Cancellation is idempotent - only the first cancellation reason is kept.
#[derive(Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Wakes tasks waiting in `cancelled()`.
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared token that cancels itself after `deadline`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Arc<Self> {
        let token = Arc::new(Self::new());
        token.cancel_after(deadline);
        token
    }

    /// Requests cancellation with a reason.
    ///
    /// Returns true if this call performed the cancellation.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let mut slot = self.reason.write();
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        // Reason is visible before the flag flips.
        *slot = Some(reason.into());
        self.cancelled.store(true, Ordering::SeqCst);
        drop(slot);
        self.notify.notify_waiters();
        true
    }

    /// Schedules cancellation after `after` elapses.
    ///
    /// The timer holds only a weak reference, so dropping every handle to
    /// the token also drops the pending deadline.
    pub fn cancel_after(self: &Arc<Self>, after: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(token) = weak.upgrade() {
                token.cancel(format!("deadline of {}ms exceeded", after.as_millis()));
            }
        });
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Completes once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
