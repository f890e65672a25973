/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be delivered, or the response body broke off.
    Transport,
    /// The server answered with something that is not a chat-completion
    /// stream.
    Protocol,
    /// Any other errors.
    Other,
}
