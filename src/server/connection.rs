//! Per-connection protocol handling.

use std::mem;
use std::sync::Arc;

use log::{trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::parser::{HttpRequest, WireParser};
use crate::server::app::App;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// Where a connection is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport open, nothing received yet.
    Connected,
    /// Bytes are arriving and being parsed.
    Receiving,
    /// A message is complete and the application is producing its response.
    Dispatching,
    /// The response has been flushed.
    Written,
    /// The transport is done.
    Closed,
}

/// One client connection.
///
/// Owns the transport, the wire parser and the request being accumulated.
/// Messages are answered strictly in arrival order, each with a fresh
/// request/response pair.
pub struct Connection<S> {
    stream: S,
    app: Arc<App>,
    parser: WireParser,
    request: HttpRequest,
    state: ConnectionState,
    read_buffer_size: usize,
    responses: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a freshly connected transport.
    pub fn new(stream: S, app: Arc<App>, read_buffer_size: usize) -> Self {
        Self {
            stream,
            app,
            parser: WireParser::new(),
            request: HttpRequest::default(),
            state: ConnectionState::Connected,
            read_buffer_size: read_buffer_size.max(1),
            responses: 0,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of responses written so far.
    pub fn responses_written(&self) -> usize {
        self.responses
    }

    /// Serve the connection until the peer closes it or asks to.
    ///
    /// A malformed request is answered with `400 Bad Request` and reported as
    /// [`Error::ParseError`]; transport failures end the connection with
    /// [`Error::IoError`]. Either way the connection ends in
    /// [`ConnectionState::Closed`].
    pub async fn run(&mut self) -> Result<(), Error> {
        let result = self.serve().await;
        self.transition(ConnectionState::Closed);
        result
    }

    async fn serve(&mut self) -> Result<(), Error> {
        let mut buf = vec![0; self.read_buffer_size];

        loop {
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }

            self.transition(ConnectionState::Receiving);
            if !self.process(&buf[..n]).await? {
                return Ok(());
            }
        }
    }

    /// Feed received bytes and answer every message they complete.
    ///
    /// Returns whether the connection should stay open.
    async fn process(&mut self, mut data: &[u8]) -> Result<bool, Error> {
        loop {
            match self.parser.feed(data, &mut self.request) {
                Ok(false) => return Ok(true),
                Ok(true) => {
                    data = &[];

                    let request = mem::take(&mut self.request);
                    let close = request.wants_close();

                    self.transition(ConnectionState::Dispatching);
                    let response = self.app.respond(request).await;
                    self.write(response).await?;

                    if close {
                        return Ok(false);
                    }
                    if !self.parser.is_idle() {
                        self.transition(ConnectionState::Receiving);
                    }
                }
                Err(e) => {
                    warn!("Rejecting malformed request: {e}");
                    let response = HttpResponse::new(StatusCode::BadRequest)
                        .with_content_type("text/plain")
                        .with_body_string(format!("Error parsing request: {e}"));
                    self.write(response).await?;
                    return Err(Error::ParseError(e));
                }
            }
        }
    }

    async fn write(&mut self, response: HttpResponse) -> Result<(), Error> {
        let bytes = response.into_bytes();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.responses += 1;
        self.transition(ConnectionState::Written);
        Ok(())
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            trace!("Connection state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
