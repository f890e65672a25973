use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::future::BoxFuture;
use neumann_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallDelta,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::ChatCompletionChunk;

/// The payload that marks the end of a completion stream.
const DONE_MARKER: &str = "[DONE]";

struct PartialState {
    sse: Sse,
    raw_events: bool,
    // Events decoded from one stream event but not yet returned. A single
    // chunk may carry text, several tool call fragments and a finish reason.
    pending: VecDeque<ModelResponseEvent>,
    done: bool,
}

type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<BoxFuture<'static, NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse, raw_events: bool) -> Self {
        let partial_state = PartialState {
            sse,
            raw_events,
            pending: Default::default(),
            done: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.done {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.done = true;
                continue;
            }
            Err(err) => {
                partial_state.sse.close();
                return Err(Error::new(format!("{err}"), ErrorKind::Transport));
            }
        };
        trace!("got sse event: {sse_event}");

        if sse_event.data == DONE_MARKER {
            partial_state.done = true;
            partial_state.sse.close();
            continue;
        }
        if partial_state.raw_events {
            partial_state
                .pending
                .push_back(ModelResponseEvent::Raw(sse_event.data.clone()));
        }

        decode_chunk(&sse_event.data, &mut partial_state.pending);
    }
}

/// Decodes one completion chunk, queueing the events it carries.
///
/// Payloads that are not valid chunks are skipped.
fn decode_chunk(data: &str, pending: &mut VecDeque<ModelResponseEvent>) {
    let chunk = match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            debug!("skipping malformed stream payload: {err}");
            return;
        }
    };
    let Some(choice) = chunk.choices.into_iter().next() else {
        return;
    };

    // The order of events matters: text first, then tool call fragments, and
    // finally the finish reason.
    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
        pending.push_back(ModelResponseEvent::TextDelta(content));
    }
    for tool_call in choice.delta.tool_calls.unwrap_or_default() {
        let function = tool_call.function.unwrap_or_default();
        pending.push_back(ModelResponseEvent::ToolCallDelta(ToolCallDelta {
            index: tool_call.index.unwrap_or(0),
            id: tool_call.id,
            name: function.name,
            arguments: function.arguments,
        }));
    }
    if let Some(reason) = choice.finish_reason {
        pending.push_back(ModelResponseEvent::Finished(
            ModelFinishReason::from_wire(&reason),
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        mut resp: Pin<&mut OpenAIResponse>,
    ) -> Vec<ModelResponseEvent> {
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let chunks = Chunks::split_every(
            include_bytes!("../fixtures/tool_call_response.txt"),
            7,
        );
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks), false));
        let events = collect(resp.as_mut()).await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::TextDelta(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Let me check.");

        let deltas: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::ToolCallDelta(delta) => Some(delta),
                _ => None,
            })
            .collect();
        assert_eq!(deltas.len(), 4);
        assert_eq!(deltas[0].id.as_deref(), Some("call_a"));
        assert_eq!(deltas[0].name.as_deref(), Some("read"));
        assert_eq!(deltas[1].index, 0);
        assert_eq!(deltas[1].arguments.as_deref(), Some("\"a.txt\"}"));
        assert_eq!(deltas[2].index, 1);
        assert_eq!(deltas[3].index, 1);

        assert_eq!(
            events.last(),
            Some(&ModelResponseEvent::Finished(ModelFinishReason::ToolCalls))
        );

        // Completed responses keep returning `None`.
        let next = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert!(matches!(next, Ok(None)));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_skipped() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"data: {not json\n\n"),
                Bytes::from_static(
                    b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n",
                ),
                Bytes::from_static(b"data: [DONE]\n\n"),
                Bytes::from_static(
                    b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
                ),
            ]
            .into(),
        );
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks), false));
        assert_eq!(
            collect(resp.as_mut()).await,
            vec![ModelResponseEvent::TextDelta("hi".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_raw_events() {
        let chunks = Chunks::split_every(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
            64,
        );
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks), true));
        let events = collect(resp.as_mut()).await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::Raw(
                    "{\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":\"stop\"}]}"
                        .to_owned()
                ),
                ModelResponseEvent::TextDelta("a".to_owned()),
                ModelResponseEvent::Finished(ModelFinishReason::Stop),
                // The end marker is not echoed.
            ]
        );
    }
}
