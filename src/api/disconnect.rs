use crate::api::models::Provider;
use crate::core::metrics::get_metrics;
use crate::core::RelayError;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A response body stream that notices when the caller goes away.
///
/// hyper drops the body when the client disconnects. If that happens before
/// the inner stream finished, the drop is recorded as a disconnect. Dropping
/// the inner stream releases the upstream session it owns.
pub struct DisconnectStream<S> {
    stream: S,
    provider: Provider,
    request_id: String,
    completed: bool,
}

impl<S> DisconnectStream<S> {
    pub fn new(stream: S, provider: Provider, request_id: String) -> Self {
        Self {
            stream,
            provider,
            request_id,
            completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl<S, E> Stream for DisconnectStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.stream).poll_next(cx);
        if let Poll::Ready(None) = poll {
            self.completed = true;
        }
        poll
    }
}

impl<S> Drop for DisconnectStream<S> {
    fn drop(&mut self) {
        if !self.completed {
            let error = RelayError::Transport;
            tracing::info!(
                request_id = %self.request_id,
                provider = %self.provider,
                error = %error,
                "Client disconnected before stream completed"
            );
            let metrics = get_metrics();
            metrics
                .client_disconnects
                .with_label_values(&[self.provider.as_str()])
                .inc();
            metrics
                .relay_errors
                .with_label_values(&[self.provider.as_str(), error.category().as_str()])
                .inc();
        }
    }
}
