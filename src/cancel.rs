//! Cancellation utilities
//!
//! Provides first-class cancellation handles for retry sequences and streams.

use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
///
/// Clones share the same underlying token, so a handle given to a
/// [`RetryingInvoker`](crate::retry::RetryingInvoker) or a stream can be
/// triggered from any task holding a clone.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Anything observing this handle stops at its next
    /// checkpoint; a cancelled stream closes the underlying HTTP connection
    /// when dropped so providers stop generating tokens.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Make a ChatStream cancellable and return its cancel handle.
///
/// Implemented via async_stream to avoid pin projection.
pub fn make_cancellable_stream(
    stream: crate::streaming::ChatStream,
) -> (crate::streaming::ChatStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                // Cancellation wins over a ready item
                biased;
                _ = token.cancelled() => break,
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(s), handle)
}
