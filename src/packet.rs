//! Wire-format definitions for IPKCP messages.
//!
//! IPKCP has two dialects, one per transport:
//! - **Textual** (stream transport): every message is one line of UTF-8 text
//!   terminated by [`TERMINATOR`].  A byte stream carries no message
//!   boundaries of its own, so [`LineBuffer`] reassembles lines from whatever
//!   chunks the kernel hands back.
//! - **Binary** (datagram transport): every datagram is exactly one message
//!   with a small fixed header.  [`Request`] and [`Response`] encode and
//!   decode those frames.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Binary wire format
//!
//! ```text
//!  Request                          Response
//! +--------+--------+---------+    +--------+--------+--------+---------+
//! | opcode | length | payload |    | opcode | status | length | payload |
//! |  0x00  |   u8   |  ...    |    |  0x01  | 0 / 1  |   u8   |  ...    |
//! +--------+--------+---------+    +--------+--------+--------+---------+
//! ```
//!
//! Payloads are limited to [`MAX_PAYLOAD`] bytes by the one-byte length field.

/// Line terminator of the textual dialect.
pub const TERMINATOR: u8 = b'\n';

/// Message that ends a textual session, in either direction.
pub const BYE: &str = "BYE";

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Opcode values of the binary dialect.
pub mod opcode {
    /// Client → server.
    pub const REQUEST: u8 = 0x00;
    /// Server → client.
    pub const RESPONSE: u8 = 0x01;
}

/// Byte length of the request header (opcode + length).
pub const REQUEST_HEADER_LEN: usize = 2;

/// Byte length of the response header (opcode + status + length).
pub const RESPONSE_HEADER_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Textual dialect
// ---------------------------------------------------------------------------

/// Frame `text` as a single textual message.
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(text.len() + 1);
    buf.extend_from_slice(text.as_bytes());
    buf.push(TERMINATOR);
    buf
}

/// Reassembly buffer for the textual dialect.
///
/// Bytes read from the stream are appended with [`LineBuffer::extend`];
/// complete lines are taken out with [`LineBuffer::next_line`].  Anything
/// after the last terminator stays buffered for the next call.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator.
    ///
    /// Returns `Ok(None)` while no terminator has been buffered yet.
    pub fn next_line(&mut self) -> Result<Option<String>, PacketError> {
        let Some(pos) = self.pending.iter().position(|&b| b == TERMINATOR) else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        String::from_utf8(line)
            .map(Some)
            .map_err(|_| PacketError::InvalidUtf8)
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial line.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// Binary dialect
// ---------------------------------------------------------------------------

/// Result code carried by a binary response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

impl Status {
    fn from_byte(b: u8) -> Result<Self, PacketError> {
        match b {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::Err),
            other => Err(PacketError::UnknownStatus(other)),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Status::Ok => 0x00,
            Status::Err => 0x01,
        }
    }
}

/// A client request datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(text: &str) -> Self {
        Self {
            payload: text.as_bytes().to_vec(),
        }
    }

    /// Serialise into a single datagram.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLong(len));
        }
        let mut buf = Vec::with_capacity(REQUEST_HEADER_LEN + len);
        buf.push(opcode::REQUEST);
        buf.push(len as u8);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a request datagram (server side; used by test peers).
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < REQUEST_HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }
        if buf[0] != opcode::REQUEST {
            return Err(PacketError::UnexpectedOpcode(buf[0]));
        }
        let len = buf[1] as usize;
        if buf.len() != REQUEST_HEADER_LEN + len {
            return Err(PacketError::LengthMismatch);
        }
        Ok(Self {
            payload: buf[REQUEST_HEADER_LEN..].to_vec(),
        })
    }
}

/// A server response datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub payload: Vec<u8>,
}

impl Response {
    /// Serialise into a single datagram (server side; used by test peers).
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLong(len));
        }
        let mut buf = Vec::with_capacity(RESPONSE_HEADER_LEN + len);
        buf.push(opcode::RESPONSE);
        buf.push(self.status.to_byte());
        buf.push(len as u8);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a response datagram.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`RESPONSE_HEADER_LEN`],
    /// - the opcode is not [`opcode::RESPONSE`] or the status is unknown, or
    /// - the length field disagrees with `buf.len()`.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < RESPONSE_HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }
        if buf[0] != opcode::RESPONSE {
            return Err(PacketError::UnexpectedOpcode(buf[0]));
        }
        let status = Status::from_byte(buf[1])?;
        let len = buf[2] as usize;
        if buf.len() != RESPONSE_HEADER_LEN + len {
            return Err(PacketError::LengthMismatch);
        }
        Ok(Self {
            status,
            payload: buf[RESPONSE_HEADER_LEN..].to_vec(),
        })
    }

    /// Render as the text shown to the user.
    ///
    /// OK payloads are returned verbatim; ERR payloads get an `ERR:` prefix.
    /// An empty OK payload renders as `OK:` so it never reads as an empty
    /// reply.
    pub fn into_text(self) -> Result<String, PacketError> {
        let text = String::from_utf8(self.payload).map_err(|_| PacketError::InvalidUtf8)?;
        Ok(match self.status {
            Status::Ok if text.is_empty() => "OK:".to_string(),
            Status::Ok => text,
            Status::Err => format!("ERR:{text}"),
        })
    }
}

/// Errors that can arise when framing or parsing a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("payload of {0} bytes exceeds the 255-byte limit")]
    PayloadTooLong(usize),
    #[error("datagram too short to contain a header")]
    BufferTooShort,
    #[error("unexpected opcode {0:#04x}")]
    UnexpectedOpcode(u8),
    #[error("unknown status code {0:#04x}")]
    UnknownStatus(u8),
    #[error("length field does not match remaining bytes")]
    LengthMismatch,
    #[error("message is not valid UTF-8")]
    InvalidUtf8,
}
