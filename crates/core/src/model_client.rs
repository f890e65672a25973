use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use neumann_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

type ProviderError = Box<dyn ModelProviderError>;
type SendRequestResult = Result<ModelClientResponse, ProviderError>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxFuture<'static, SendRequestResult> + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!(
                        "sending a request with {} messages",
                        req.messages.len()
                    );
                    match fut.await {
                        Ok(resp) => Ok(ModelClientResponse {
                            inner: Box::pin(resp),
                        }),
                        Err(err) => {
                            error!("request failed: {err}");
                            Err(Box::new(err) as ProviderError)
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and resolves once the response starts streaming.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

trait ErasedResponse: Send {
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, ProviderError>>;
}

impl<R: ModelResponse> ErasedResponse for R {
    #[inline]
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, ProviderError>> {
        ModelResponse::poll_next_event(self, cx)
            .map_err(|err| Box::new(err) as ProviderError)
    }
}

/// A streaming response from the model client.
pub struct ModelClientResponse {
    inner: Pin<Box<dyn ErasedResponse>>,
}

impl ModelClientResponse {
    /// Waits for the next event, `None` once the response is complete.
    ///
    /// Dropping the response releases the underlying connection.
    #[inline]
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<ModelResponseEvent>, ProviderError> {
        let event = poll_fn(|cx| self.inner.as_mut().poll_next_event(cx)).await;
        if let Err(err) = &event {
            error!("response stream failed: {err}");
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use neumann_model::{ErrorKind, Message};
    use neumann_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            messages: vec![Message::user("Hi")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_text("How are you?"));
        }

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let mut resp = model_client.send_request(request()).await.unwrap();
            let mut transcript = String::new();
            let mut finished = false;
            while let Some(event) = resp.next_event().await.unwrap() {
                match event {
                    ModelResponseEvent::TextDelta(text) => {
                        transcript.push_str(&text)
                    }
                    ModelResponseEvent::Finished(_) => finished = true,
                    _ => {}
                }
            }
            assert_eq!(transcript, "How are you?");
            assert!(finished);
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client.send_request(request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
