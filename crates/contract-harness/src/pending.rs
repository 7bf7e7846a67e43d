//! Re-readable handle to an HTTP exchange that has not necessarily completed.

use crate::client::ResponseSnapshot;
use crate::error::Failure;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Settled value of a [`Pending`].
pub type Settled = Result<Arc<ResponseSnapshot>, Failure>;

/// A future resolving to a [`ResponseSnapshot`] or rejecting with a [`Failure`].
///
/// Cloning is cheap and every clone observes the same single exchange: the request
/// runs at most once, the first time any clone is awaited, and later awaits return
/// the stored outcome.
#[derive(Clone)]
pub struct Pending {
    label: Arc<str>,
    inner: Shared<BoxFuture<'static, Settled>>,
}

impl Pending {
    /// Wrap an exchange future. `label` identifies the request in logs and reports.
    pub fn new<F>(label: impl Into<String>, exchange: F) -> Self
    where
        F: Future<Output = Settled> + Send + 'static,
    {
        Self {
            label: Arc::from(label.into()),
            inner: exchange.boxed().shared(),
        }
    }

    /// A pending result that is already fulfilled.
    pub fn fulfilled(label: impl Into<String>, snapshot: ResponseSnapshot) -> Self {
        Self::new(label, futures::future::ready(Ok(Arc::new(snapshot))))
    }

    /// A pending result that is already rejected.
    pub fn rejected(label: impl Into<String>, failure: Failure) -> Self {
        Self::new(label, futures::future::ready(Err(failure)))
    }

    /// Wait for the exchange to settle and return its outcome.
    pub async fn settle(&self) -> Settled {
        self.inner.clone().await
    }

    /// The outcome, if the exchange has already settled.
    pub fn peek(&self) -> Option<Settled> {
        self.inner.peek().cloned()
    }

    /// Whether the exchange has settled.
    pub fn is_settled(&self) -> bool {
        self.inner.peek().is_some()
    }

    /// Request label, e.g. `"GET http://localhost:8000/api"`.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("label", &self.label)
            .field("settled", &self.is_settled())
            .finish()
    }
}
