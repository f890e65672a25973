use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::mem;

use super::{Chunks, ChunksError};

const FIELD_SEPARATOR: char = ':';

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChunksError(err) => write!(f, "failed to read stream: {err}"),
        }
    }
}

/// A server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub id: Option<String>,
    pub event: String,
    pub data: String,
    pub retry: Option<u64>,
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} event", self.event)?;
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            write!(f, " #{id}")?;
        }
        match self.data.len() {
            0 => write!(f, ", no data")?,
            1 => write!(f, ", 1 byte")?,
            n => write!(f, ", {n} bytes")?,
        }
        if let Some(retry) = self.retry {
            write!(f, ", retry in {retry}ms")?;
        }
        Ok(())
    }
}

/// A type for reading server-sent events from a chunk stream.
///
/// Lines may end with `\r\n`, `\r` or `\n`. A block ends where two line
/// endings meet as `\r\r`, `\n\n` or `\r\n\r\n` (so `\r\n\n` ends one
/// too, while `\n\r` does not). A `\r` is only resolved once the next byte
/// is known, which keeps the produced events independent of how the
/// transport splits the bytes.
pub struct Sse {
    chunks: Option<Chunks>,
    line: Vec<u8>,
    lines: Vec<Vec<u8>>,
    pending_cr: bool,
    last_ending: Option<Ending>,
    blocks: VecDeque<Vec<Vec<u8>>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ending {
    Cr,
    Lf,
    CrLf,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            chunks: Some(chunks),
            line: Vec::new(),
            lines: Vec::new(),
            pending_cr: false,
            last_ending: None,
            blocks: VecDeque::new(),
        }
    }

    /// Returns the next event, or `None` when the stream is exhausted or has
    /// been closed.
    pub async fn next_event(&mut self) -> Result<Option<Event>, Error> {
        loop {
            // Drain the complete blocks first. Blocks without data are never
            // surfaced.
            while let Some(block) = self.blocks.pop_front() {
                if let Some(event) = parse_block(&block) {
                    return Ok(Some(event));
                }
            }

            let Some(chunks) = &mut self.chunks else {
                return Ok(None);
            };
            match chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.feed(&bytes),
                None => {
                    // The remainder is dispatched even without a trailing
                    // empty line.
                    self.flush();
                    self.chunks = None;
                }
            }
        }
    }

    /// Closes the stream, releasing the underlying transport.
    ///
    /// Events that are buffered but not yet returned are discarded.
    pub fn close(&mut self) {
        self.chunks = None;
        self.line.clear();
        self.lines.clear();
        self.blocks.clear();
        self.pending_cr = false;
        self.last_ending = None;
    }

    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    self.end_line(Ending::CrLf);
                    continue;
                }
                self.end_line(Ending::Cr);
            }
            match byte {
                b'\r' => self.pending_cr = true,
                b'\n' => self.end_line(Ending::Lf),
                _ => self.line.push(byte),
            }
        }
    }

    fn end_line(&mut self, ending: Ending) {
        let previous = self.last_ending.replace(ending);
        if !self.line.is_empty() {
            self.lines.push(mem::take(&mut self.line));
            return;
        }

        let terminates = matches!(
            (previous, ending),
            (Some(Ending::Cr), Ending::Cr)
                | (Some(Ending::Lf), Ending::Lf)
                | (Some(Ending::CrLf), Ending::CrLf)
                | (Some(Ending::CrLf), Ending::Lf)
        );
        // Other empty lines stay inside the block and are skipped later.
        if terminates {
            self.last_ending = None;
            if !self.lines.is_empty() {
                self.blocks.push_back(mem::take(&mut self.lines));
            }
        }
    }

    fn flush(&mut self) {
        if mem::take(&mut self.pending_cr) {
            self.end_line(Ending::Cr);
        }
        if !self.line.is_empty() {
            self.lines.push(mem::take(&mut self.line));
        }
        if !self.lines.is_empty() {
            self.blocks.push_back(mem::take(&mut self.lines));
        }
        self.last_ending = None;
    }
}

fn parse_block(lines: &[Vec<u8>]) -> Option<Event> {
    let mut id = None;
    let mut event_type = None;
    let mut data = String::new();
    let mut retry = None;

    for line in lines {
        let line = String::from_utf8_lossy(line);

        // Lines starting with a separator are comments.
        if line.trim().is_empty() || line.starts_with(FIELD_SEPARATOR) {
            continue;
        }

        let (field, value) = match line.split_once(FIELD_SEPARATOR) {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.as_ref(), ""),
        };

        match field {
            "data" => {
                data.push_str(value);
                data.push('\n');
            }
            "id" => id = Some(value.to_owned()),
            "event" => event_type = Some(value.to_owned()),
            "retry" => match value.parse() {
                Ok(millis) => retry = Some(millis),
                Err(_) => debug!("ignoring non-numeric retry field: {value}"),
            },
            _ => debug!("saw invalid field {field} while parsing event stream"),
        }
    }

    if data.is_empty() {
        return None;
    }
    // Each `data` line appended exactly one newline.
    data.pop();

    Some(Event {
        id,
        event: event_type
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "message".to_owned()),
        data,
        retry,
    })
}
