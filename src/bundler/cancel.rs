//! Run-wide cancellation.
//!
//! One `CancelToken` is shared by everything a bundling run awaits. Once
//! cancelled it stays cancelled; every guarded future resolves to
//! `BundleError::Cancelled` from then on.

use crate::error::BundleError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        if !self.state.send_replace(true) {
            debug!("Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Run `fut` unless the token fires first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, BundleError> {
        if self.is_cancelled() {
            return Err(BundleError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(BundleError::Cancelled),
            output = fut => Ok(output),
        }
    }

    /// Sleep for `duration`, waking early with an error if cancelled.
    pub async fn sleep(&self, duration: Duration) -> Result<(), BundleError> {
        self.guard(tokio::time::sleep(duration)).await
    }

    /// Cancel the token once `deadline` has elapsed.
    pub fn cancel_after(&self, deadline: Duration) -> JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            debug!("Deadline of {:?} reached", deadline);
            token.cancel();
        })
    }
}
