//! Incremental wire parser.
//!
//! Bytes are fed in as they arrive from the transport. The request head is
//! handed to `httparse` once it is complete, then the body is framed by
//! `Transfer-Encoding: chunked` or `Content-Length`. Each element is reported
//! to a [`ParserEvents`] sink as soon as it is known.

use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Maximum number of headers accepted in one request.
pub const MAX_HEADERS: usize = 64;

/// Maximum size of the request line plus headers.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Receiver of parse events for one message.
pub trait ParserEvents {
    /// The request target, exactly as sent.
    fn on_url(&mut self, url: &str);
    /// One header line.
    fn on_header(&mut self, name: &[u8], value: &[u8]);
    /// A slice of the (de-chunked) body.
    fn on_body(&mut self, chunk: &[u8]);
    /// The message is complete.
    fn on_message_complete(&mut self, method: Method, version: HttpVersion);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body { remaining: usize },
    ChunkSize,
    ChunkData { remaining: usize },
    ChunkDataEnd,
    Trailers,
}

/// Incremental HTTP/1.x request parser.
#[derive(Debug)]
pub struct WireParser {
    buffer: Vec<u8>,
    state: State,
    method: Method,
    version: HttpVersion,
}

impl Default for WireParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WireParser {
    /// Create a parser waiting for a request head.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: State::Head,
            method: Method::default(),
            version: HttpVersion::default(),
        }
    }

    /// Number of bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the parser sits between messages with nothing pending.
    pub fn is_idle(&self) -> bool {
        self.state == State::Head && self.buffer.is_empty()
    }

    /// Feed bytes into the parser.
    ///
    /// Returns `Ok(true)` as soon as one message completes. Any bytes past the
    /// end of that message stay buffered; call `feed` again (with an empty
    /// slice if nothing new arrived) to continue with the next message.
    pub fn feed<E: ParserEvents>(&mut self, data: &[u8], events: &mut E) -> Result<bool, Error> {
        self.buffer.extend_from_slice(data);

        loop {
            match self.state {
                State::Head => match self.parse_head(events)? {
                    Some(consumed) => {
                        self.buffer.drain(..consumed);
                    }
                    None => return Ok(false),
                },
                State::Body { remaining: 0 } => return Ok(self.complete(events)),
                State::Body { remaining } => {
                    let Some(taken) = self.take_body(remaining, events) else {
                        return Ok(false);
                    };
                    self.state = State::Body { remaining: remaining - taken };
                }
                State::ChunkSize => match httparse::parse_chunk_size(&self.buffer) {
                    Ok(httparse::Status::Complete((consumed, size))) => {
                        self.buffer.drain(..consumed);
                        self.state = if size == 0 {
                            State::Trailers
                        } else {
                            let remaining = usize::try_from(size).map_err(|_| Error::InvalidChunk)?;
                            State::ChunkData { remaining }
                        };
                    }
                    Ok(httparse::Status::Partial) => return Ok(false),
                    Err(_) => return Err(Error::InvalidChunk),
                },
                State::ChunkData { remaining: 0 } => self.state = State::ChunkDataEnd,
                State::ChunkData { remaining } => {
                    let Some(taken) = self.take_body(remaining, events) else {
                        return Ok(false);
                    };
                    self.state = State::ChunkData { remaining: remaining - taken };
                }
                State::ChunkDataEnd => {
                    if self.buffer.len() < 2 {
                        return Ok(false);
                    }
                    if &self.buffer[..2] != b"\r\n" {
                        return Err(Error::InvalidChunk);
                    }
                    self.buffer.drain(..2);
                    self.state = State::ChunkSize;
                }
                State::Trailers => {
                    // Trailer fields are read past and dropped.
                    if self.buffer.starts_with(b"\r\n") {
                        self.buffer.drain(..2);
                        return Ok(self.complete(events));
                    }
                    match find(&self.buffer, b"\r\n\r\n") {
                        Some(pos) => {
                            self.buffer.drain(..pos + 4);
                            return Ok(self.complete(events));
                        }
                        None if self.buffer.len() > MAX_HEAD_SIZE => {
                            return Err(Error::HeadTooLarge(MAX_HEAD_SIZE));
                        }
                        None => return Ok(false),
                    }
                }
            }
        }
    }

    fn parse_head<E: ParserEvents>(&mut self, events: &mut E) -> Result<Option<usize>, Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut request = httparse::Request::new(&mut headers);

        let consumed = match request.parse(&self.buffer)? {
            httparse::Status::Complete(consumed) => consumed,
            httparse::Status::Partial => {
                if self.buffer.len() > MAX_HEAD_SIZE {
                    return Err(Error::HeadTooLarge(MAX_HEAD_SIZE));
                }
                return Ok(None);
            }
        };

        // A complete head always carries method, path and version.
        let method = request.method.unwrap_or_default().to_ascii_uppercase();
        let method = Method::from_str(&method)?;
        let version = HttpVersion::from_minor(request.version.unwrap_or(1));

        events.on_url(request.path.unwrap_or("/"));

        let mut content_length = None;
        let mut chunked = false;
        for header in request.headers.iter() {
            events.on_header(header.name.as_bytes(), header.value);

            if header.name.eq_ignore_ascii_case("Content-Length") {
                let length = parse_content_length(header.value)?;
                if content_length.is_some_and(|previous| previous != length) {
                    return Err(Error::InvalidContentLength);
                }
                content_length = Some(length);
            } else if header.name.eq_ignore_ascii_case("Transfer-Encoding") {
                // Only the final coding decides the framing.
                chunked = String::from_utf8_lossy(header.value)
                    .rsplit(',')
                    .next()
                    .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
            }
        }

        self.method = method;
        self.version = version;
        self.state = if chunked {
            State::ChunkSize
        } else {
            State::Body { remaining: content_length.unwrap_or(0) }
        };

        Ok(Some(consumed))
    }

    fn take_body<E: ParserEvents>(&mut self, remaining: usize, events: &mut E) -> Option<usize> {
        if self.buffer.is_empty() {
            return None;
        }
        let taken = remaining.min(self.buffer.len());
        events.on_body(&self.buffer[..taken]);
        self.buffer.drain(..taken);
        Some(taken)
    }

    fn complete<E: ParserEvents>(&mut self, events: &mut E) -> bool {
        events.on_message_complete(self.method, self.version);
        self.state = State::Head;
        true
    }
}

/// `Content-Length` is `1*DIGIT`; signs and inner whitespace are rejected.
fn parse_content_length(value: &[u8]) -> Result<usize, Error> {
    let digits = std::str::from_utf8(value)
        .map_err(|_| Error::InvalidContentLength)?
        .trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidContentLength);
    }
    digits.parse().map_err(|_| Error::InvalidContentLength)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
