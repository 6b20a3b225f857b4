//! VTY response framing.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Plaintext Response                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 Marker (0x00)          |     Status Code      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! There is no length prefix, so the end of a response is found by scanning
//! the accumulated bytes for the marker. Plaintext containing three
//! consecutive NUL bytes is indistinguishable from a trailer; daemons never
//! emit that as ordinary output.

use crate::status::StatusCode;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

/// Three NUL bytes that precede the status byte.
pub const TERMINATION_MARKER: [u8; 3] = [0, 0, 0];

/// Marker plus status byte.
pub const TRAILER_LEN: usize = 4;

/// Size of each transport read.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Terminates every command sent to a daemon.
pub const COMMAND_TERMINATOR: u8 = 0;

/// Where the decoder is after the last chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No usable marker yet.
    Accumulating,
    /// Marker seen at the tail, status byte not yet arrived.
    AwaitingStatus,
    /// Trailer received.
    Complete(StatusCode),
}

/// A complete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub plaintext: Vec<u8>,
    pub status: StatusCode,
}

/// Accumulates transport chunks until a trailer closes the response.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    state: FrameState,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: FrameState::Accumulating,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Append a chunk and rescan the whole buffer for the trailer.
    ///
    /// Chunks pushed after completion are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> FrameState {
        if matches!(self.state, FrameState::Complete(_)) {
            return self.state;
        }

        self.buf.extend_from_slice(chunk);

        self.state = match find_marker(&self.buf) {
            Some(idx) => match self.buf.len() - idx {
                TRAILER_LEN => FrameState::Complete(StatusCode::from(self.buf[self.buf.len() - 1])),
                n if n < TRAILER_LEN => FrameState::AwaitingStatus,
                // Marker sits earlier in the buffer than the tail: keep reading.
                _ => FrameState::Accumulating,
            },
            None => FrameState::Accumulating,
        };
        self.state
    }

    /// Bytes received so far, without the trailer once complete.
    pub fn plaintext(&self) -> &[u8] {
        match self.state {
            FrameState::Complete(_) => &self.buf[..self.buf.len() - TRAILER_LEN],
            _ => &self.buf,
        }
    }

    /// Returns the frame if complete, otherwise the partial bytes.
    pub fn finish(mut self) -> Result<Frame, Vec<u8>> {
        match self.state {
            FrameState::Complete(status) => {
                self.buf.truncate(self.buf.len() - TRAILER_LEN);
                Ok(Frame {
                    plaintext: self.buf,
                    status,
                })
            }
            _ => Err(self.buf),
        }
    }
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATION_MARKER.len())
        .position(|w| w == TERMINATION_MARKER)
}

/// Transport failure part-way through a response.
#[derive(Debug)]
pub struct ReadFailure {
    /// Plaintext accumulated before the failure.
    pub partial: Vec<u8>,
    pub source: io::Error,
}

/// Read from `reader` until a full frame arrives or `deadline` passes.
///
/// The deadline bounds all reads together. EOF before completion is
/// reported as `UnexpectedEof`, an expired deadline as `TimedOut`.
pub async fn read_frame<R>(reader: &mut R, deadline: Instant) -> Result<Frame, ReadFailure>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = match timeout_at(deadline, reader.read(&mut chunk)).await {
            Ok(read) => read,
            Err(_) => {
                return Err(ReadFailure {
                    partial: decoder.plaintext().to_vec(),
                    source: deadline_exceeded(),
                });
            }
        };

        let n = match read {
            Ok(0) => {
                return Err(ReadFailure {
                    partial: decoder.plaintext().to_vec(),
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before response trailer",
                    ),
                });
            }
            Ok(n) => n,
            Err(e) => {
                return Err(ReadFailure {
                    partial: decoder.plaintext().to_vec(),
                    source: e,
                });
            }
        };

        if let FrameState::Complete(_) = decoder.push(&chunk[..n]) {
            return decoder.finish().map_err(|partial| ReadFailure {
                partial,
                source: io::Error::other("frame decoder lost completed state"),
            });
        }
    }
}

pub(crate) fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")
}

/// Write `command` unchanged, followed by the NUL terminator.
pub async fn write_command<W>(writer: &mut W, command: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut msg = Vec::with_capacity(command.len() + 1);
    msg.extend_from_slice(command);
    msg.push(COMMAND_TERMINATOR);
    writer.write_all(&msg).await?;
    writer.flush().await
}

/// Encode a response the way a daemon sends it.
pub fn encode_response(plaintext: &[u8], status: StatusCode) -> Vec<u8> {
    let mut out = Vec::with_capacity(plaintext.len() + TRAILER_LEN);
    out.extend_from_slice(plaintext);
    out.extend_from_slice(&TERMINATION_MARKER);
    out.push(status.as_u8());
    out
}
