use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors surfaced by a [`ModelProvider`] or its responses.
///
/// The agent only inspects [`ErrorKind`] to tell a dropped connection apart
/// from a server that speaks the wrong protocol; the rest is shown as-is.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the failure.
    fn kind(&self) -> ErrorKind;
}

/// A chat-completion endpoint that answers with a stream of events.
///
/// Providers hold configuration only. Each call to
/// [`send_request`](ModelProvider::send_request) opens an independent
/// stream, so a provider can be shared by several agents.
pub trait ModelProvider: Send + Sync {
    /// Error produced while connecting or streaming.
    type Error: ModelProviderError;

    /// The stream handed out for an accepted request.
    type Response: ModelResponse<Error = Self::Error>;

    /// Opens a streaming completion for `req`.
    ///
    /// Resolves after the status line and headers arrive. Body events are
    /// pulled from the returned [`ModelResponse`].
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
