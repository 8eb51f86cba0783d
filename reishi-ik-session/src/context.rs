//! Cancellation and deadlines for a handshake call.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why an in-flight handshake was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => f.write_str("cancelled"),
            AbortReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Cancellation scope passed to [`Session::run_ik`](crate::Session::run_ik).
///
/// Clones share the same cancellation signal.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Aborts every clone of the [`Context`] it was created with.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (_tx, cancelled) = watch::channel(false);
        Self {
            cancelled,
            deadline: None,
        }
    }

    /// A context plus the handle that cancels it.
    pub fn with_cancel() -> (Self, Canceller) {
        let (tx, cancelled) = watch::channel(false);
        let ctx = Self {
            cancelled,
            deadline: None,
        };
        (ctx, Canceller { tx })
    }

    /// Abort once `at` passes. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < at => current,
            _ => at,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context has already been aborted.
    pub fn aborted(&self) -> Option<AbortReason> {
        if *self.cancelled.borrow() {
            return Some(AbortReason::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(AbortReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context is aborted; pending forever otherwise.
    pub async fn done(&self) -> AbortReason {
        let mut rx = self.cancelled.clone();
        let cancelled = async move {
            // A dropped canceller can never fire.
            if rx.wait_for(|c| *c).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        match self.deadline {
            Some(at) => tokio::select! {
                biased;
                _ = cancelled => AbortReason::Cancelled,
                _ = tokio::time::sleep_until(at) => AbortReason::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                AbortReason::Cancelled
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
