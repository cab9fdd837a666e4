use crate::api::models::Provider;
use crate::core::RelayError;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Lazy sequence of text fragments, or a single terminal failure.
pub type FragmentStream = BoxStream<'static, Result<String, RelayError>>;

/// One open streaming call to an upstream provider.
///
/// The session owns the underlying network resource. [`close`] releases it
/// and is idempotent; dropping an open session closes it. After close the
/// session yields nothing further.
///
/// [`close`]: UpstreamSession::close
pub struct UpstreamSession {
    provider: Provider,
    fragments: Option<FragmentStream>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl UpstreamSession {
    pub fn new<S>(provider: Provider, fragments: S) -> Self
    where
        S: Stream<Item = Result<String, RelayError>> + Send + 'static,
    {
        Self {
            provider,
            fragments: Some(fragments.boxed()),
            on_release: None,
        }
    }

    /// Register a callback that runs when the session is released.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn is_closed(&self) -> bool {
        self.fragments.is_none()
    }

    /// Release the upstream call. Only the first call has any effect.
    pub fn close(&mut self) {
        if let Some(fragments) = self.fragments.take() {
            // Dropping the stream drops the in-flight response body, which
            // closes the connection.
            drop(fragments);
            if let Some(hook) = self.on_release.take() {
                hook();
            }
            tracing::trace!(provider = %self.provider, "Upstream session released");
        }
    }
}

impl Stream for UpstreamSession {
    type Item = Result<String, RelayError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().fragments.as_mut() {
            Some(fragments) => fragments.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for UpstreamSession {
    fn drop(&mut self) {
        self.close();
    }
}
