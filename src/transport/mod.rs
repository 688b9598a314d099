//! Uniform transport abstraction over stream and datagram sockets.
//!
//! The session layer talks to a `Box<dyn Transport>` and never branches on
//! the transport kind after construction.  Every kind-specific detail
//! (message boundaries, the termination exchange, how a closed peer shows
//! up) is pushed down into the implementations:
//! - [`StreamTransport`]:   blocking `TcpStream`, textual dialect.
//! - [`DatagramTransport`]: blocking `UdpSocket`, binary dialect.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::packet::PacketError;

mod datagram;
mod stream;

#[cfg(test)]
pub(crate) mod scripted;

pub use datagram::{DatagramTransport, RESPONSE_WINDOW};
pub use stream::StreamTransport;

/// Which socket type carries the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connection-oriented byte stream (TCP).
    Stream,
    /// Connectionless datagrams (UDP).
    Datagram,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::Datagram => f.write_str("datagram"),
        }
    }
}

/// One unit read from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete protocol message.
    Message(String),
    /// The peer ended the session and this was its last word.
    Farewell(String),
    /// The peer closed without a message.
    Closed,
}

/// Errors that can arise from transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to resolve {target}: {source}")]
    Resolve { target: String, source: io::Error },
    #[error("no address found for {0}")]
    NoAddress(String),
    #[error("could not connect to {target}: {source}")]
    Connect { target: String, source: io::Error },
    #[error("could not set up local socket: {0}")]
    Bind(io::Error),
    #[error("send failed: {0}")]
    Send(io::Error),
    #[error("receive failed: {0}")]
    Receive(io::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] PacketError),
    #[error("transport is not open")]
    NotOpen,
}

/// The four operations every transport provides, plus the termination
/// exchange that rides on top of them.
pub trait Transport {
    fn kind(&self) -> TransportKind;

    /// Resolve `host:port` and make the socket ready for [`Transport::send`].
    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    /// Frame `message` and hand it to the kernel.  Returns the number of
    /// bytes put on the wire.
    fn send(&mut self, message: &str) -> Result<usize, TransportError>;

    /// Block until one complete message arrives or the peer goes away.
    fn receive(&mut self) -> Result<Inbound, TransportError>;

    /// Tell the peer the session is ending and collect its acknowledgement,
    /// if the dialect has one.  Returns the acknowledgement text.
    fn farewell(&mut self) -> Result<Option<String>, TransportError>;

    /// Release the socket.  Calling it again is a no-op.
    fn close(&mut self);
}

/// Build the transport for `kind`, not yet opened.
pub fn for_kind(kind: TransportKind) -> Box<dyn Transport> {
    match kind {
        TransportKind::Stream => Box::new(StreamTransport::new()),
        TransportKind::Datagram => Box::new(DatagramTransport::new()),
    }
}

/// Resolve `host:port` to every candidate socket address.
pub(crate) fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError> {
    let target = format!("{host}:{port}");
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            target: target.clone(),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(TransportError::NoAddress(target));
    }
    log::debug!("resolved {target} to {addrs:?}");
    Ok(addrs)
}
