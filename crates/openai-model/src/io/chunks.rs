#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// Reading the response body failed mid-stream.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(String);

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of raw body bytes for the event reader.
///
/// Tests feed canned byte slices instead of a live response.
pub enum Chunks {
    Http(Response),
    #[cfg(test)]
    Canned(VecDeque<Bytes>),
}

impl Chunks {
    pub fn from_response(response: Response) -> Self {
        Chunks::Http(response)
    }

    #[cfg(test)]
    pub fn from_vec_deque(chunks: VecDeque<Bytes>) -> Self {
        Chunks::Canned(chunks)
    }

    /// Cuts `data` into pieces of `size` bytes, the last one possibly shorter.
    #[cfg(test)]
    pub fn split_every(data: &'static [u8], size: usize) -> Self {
        Chunks::Canned(data.chunks(size).map(Bytes::from_static).collect())
    }

    /// Returns the next piece of the body, `None` at the end.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Http(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))
            }
            #[cfg(test)]
            Chunks::Canned(chunks) => Ok(chunks.pop_front()),
        }
    }
}
