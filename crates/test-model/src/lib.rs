//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use neumann_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    finish_reason: ModelFinishReason,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            let idx = this.event_idx;
            if idx <= this.events.len() {
                this.event_idx += 1;
            }
            let event = match this.events.get(idx) {
                Some(PresetEvent::TextDelta(text)) => {
                    ModelResponseEvent::TextDelta(text.clone())
                }
                Some(PresetEvent::ToolCallDelta(delta)) => {
                    ModelResponseEvent::ToolCallDelta(delta.clone())
                }
                Some(PresetEvent::Raw(data)) => {
                    ModelResponseEvent::Raw(data.clone())
                }
                Some(PresetEvent::Disconnect) => {
                    // Nothing can be read after a broken connection.
                    this.event_idx = this.events.len() + 1;
                    return Poll::Ready(Err(Error {
                        message: "connection reset by peer",
                        kind: ErrorKind::Transport,
                    }));
                }
                None if idx == this.events.len() => {
                    ModelResponseEvent::Finished(this.finish_reason.clone())
                }
                // In case this method is called after completion.
                None => return Poll::Ready(Ok(None)),
            };
            return Poll::Ready(Ok(Some(event)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to queue the preset responses. Each
/// request consumes the next response in the queue, and fails when the queue
/// is empty. Clones share the same queue, so a clone kept by the test can
/// inspect the recorded requests afterwards.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Queues a response for the next unanswered request.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.script().responses.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, including failed ones.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.script().requests.clone()
    }

    /// Returns the number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script().responses.len()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panicking test poisons the lock, the script is still usable.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_response(&self) -> Result<PresetResponse, Error> {
        let mut script = self.script();
        let Some(failures) = script.responses.front().map(|preset| preset.failures)
        else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };
        let refused = Error {
            message: "connection refused",
            kind: ErrorKind::Transport,
        };
        match failures {
            Some(0) => return Err(refused),
            Some(failures) if script.failed_attempts < failures => {
                script.failed_attempts += 1;
                return Err(refused);
            }
            _ => {}
        }
        script.failed_attempts = 0;
        script.responses.pop_front().ok_or(Error {
            message: "no enough steps",
            kind: ErrorKind::Other,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        self.script().requests.push(req.clone());
        let resp = self.next_response().map(|preset| {
            let finish_reason = if preset.has_tool_calls() {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            };
            TestModelResponse {
                events: preset.events,
                finish_reason,
                event_idx: 0,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            }
        });
        ready(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use neumann_model::{Message, ModelRequest, ToolCallDelta};

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> Result<(String, Vec<ToolCallDelta>, ModelFinishReason), Error> {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut deltas = vec![];
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await?
                .unwrap();
            match event {
                ModelResponseEvent::Finished(reason) => {
                    return Ok((msg, deltas, reason));
                }
                ModelResponseEvent::TextDelta(delta) => msg.push_str(&delta),
                ModelResponseEvent::ToolCallDelta(delta) => deltas.push(delta),
                ModelResponseEvent::Raw(_) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("Hello, world!"));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::TextDelta("Sure, let me take a look.".to_owned()),
            PresetEvent::tool_call_delta(
                0,
                Some("call_1"),
                Some("read"),
                Some(r#"{"path":"#),
            ),
            PresetEvent::tool_call_delta(0, None, None, Some(r#""todo.txt"}"#)),
        ]));

        let mut req = ModelRequest {
            messages: vec![Message::user("Hi")],
            tools: vec![],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, deltas, reason) = collect_response(resp).await.unwrap();
        assert_eq!(msg, "Hello, world!");
        assert!(deltas.is_empty());
        assert_eq!(reason, ModelFinishReason::Stop);

        req.messages.push(Message::user("Check my todo"));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, deltas, reason) = collect_response(resp).await.unwrap();
        assert_eq!(msg, "Sure, let me take a look.");
        assert_eq!(deltas.len(), 2);
        assert_eq!(reason, ModelFinishReason::ToolCalls);

        assert_eq!(provider.requests().len(), 2);
        assert_eq!(provider.remaining(), 0);
        assert!(provider.send_request(&req).await.is_err());
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("ok").with_failures(2));
        let req = ModelRequest {
            messages: vec![Message::user("Hi")],
            tools: vec![],
        };
        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Transport);
        }
        assert!(provider.send_request(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::TextDelta("partial".to_owned()),
            PresetEvent::Disconnect,
        ]));
        let req = ModelRequest {
            messages: vec![Message::user("Hi")],
            tools: vec![],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
