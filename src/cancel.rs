//! Cooperative request cancellation.
//!
//! A [`CancelToken`] rides along in a [`RequestConfig`](crate::RequestConfig)
//! and is consulted by the dispatcher, never by the interceptor chain itself.
//! The paired [`Canceler`] trips the token from anywhere.

use tokio::sync::watch;

/// Cancellation handle carried by a request configuration.
///
/// Cloning is cheap; all clones observe the same cancellation state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<Option<String>>,
}

/// The producing side of a [`CancelToken`].
#[derive(Debug)]
pub struct Canceler {
    tx: watch::Sender<Option<String>>,
}

impl CancelToken {
    /// Create a token/canceler pair.
    pub fn new() -> (CancelToken, Canceler) {
        let (tx, rx) = watch::channel(None);
        (CancelToken { rx }, Canceler { tx })
    }

    /// Check whether the token has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The cancellation reason, if cancelled.
    pub fn reason(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Wait until the token is tripped, returning the reason.
    ///
    /// Resolves immediately if cancellation already happened. If the
    /// [`Canceler`] is dropped without cancelling, this pends forever.
    pub async fn cancelled(&self) -> String {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = rx.borrow().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                // Canceler dropped; cancellation can no longer happen.
                futures::future::pending::<()>().await;
            }
        }
    }
}

impl Canceler {
    /// Trip the token with a reason.
    pub fn cancel(&self, reason: impl Into<String>) {
        // send_replace never fails even with no live receivers.
        self.tx.send_replace(Some(reason.into()));
    }
}
