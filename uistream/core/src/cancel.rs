//! Cooperative Cancellation
//!
//! A [`CancelSignal`] is shared between a running session (or playback) and
//! whoever may stop it. The running side checks it at every suspension point
//! by racing [`CancelSignal::cancelled`] against its read or timer in
//! `tokio::select!`, so cancelling never requires the producer to send more
//! data.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

/// How long a cancel notice may wait for room in a full observer channel
pub const CANCEL_NOTICE_TIMEOUT: Duration = Duration::from_millis(250);

/// Cloneable, idempotent cancellation flag
#[derive(Clone, Debug)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    /// Create a signal in the not-cancelled state
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation
    ///
    /// Returns `true` if this call flipped the flag, `false` if it was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Deliver a terminal notice after a cancel, waiting at most
/// [`CANCEL_NOTICE_TIMEOUT`] for a slow observer
///
/// Returns `false` if the observer is gone or never made room.
pub(crate) async fn send_cancel_notice<T>(tx: &mpsc::Sender<T>, notice: T) -> bool {
    matches!(
        tokio::time::timeout(CANCEL_NOTICE_TIMEOUT, tx.send(notice)).await,
        Ok(Ok(()))
    )
}
