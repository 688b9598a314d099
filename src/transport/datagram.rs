//! Datagram transport: blocking UDP carrying the binary dialect.
//!
//! One datagram is one message.  There is no handshake: `open` only binds an
//! ephemeral local port and associates the socket with the server address,
//! so a wrong port first shows up as a failed `receive`.
//!
//! Datagrams can be lost and a server can go quiet, so every `receive` is
//! bounded by a read timeout.  Silence for the whole window is reported as
//! [`Inbound::Closed`], the same observable as a closed TCP peer.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use super::{resolve, Inbound, Transport, TransportError, TransportKind};
use crate::packet::{Request, Response};

/// Maximum UDP payload size (theoretical limit; responses are far smaller).
const MAX_DATAGRAM: usize = 65_535;

/// How long `receive` waits for a response before giving up on the server.
pub const RESPONSE_WINDOW: Duration = Duration::from_secs(4);

/// A UDP socket speaking IPKCP request/response frames.
#[derive(Debug)]
pub struct DatagramTransport {
    socket: Option<UdpSocket>,
    window: Duration,
}

impl Default for DatagramTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DatagramTransport {
    pub fn new() -> Self {
        Self::with_window(RESPONSE_WINDOW)
    }

    /// Use `window` instead of [`RESPONSE_WINDOW`] as the receive timeout.
    pub fn with_window(window: Duration) -> Self {
        Self {
            socket: None,
            window,
        }
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::NotOpen)
    }
}

/// Wildcard local address of the same family as `remote`, ephemeral port.
fn local_for(remote: &SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

impl Transport for DatagramTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let remote = resolve(host, port)?[0];
        let socket = UdpSocket::bind(local_for(&remote)).map_err(TransportError::Bind)?;
        // Kernel-side association only; nothing is sent.
        socket.connect(remote).map_err(TransportError::Bind)?;
        socket
            .set_read_timeout(Some(self.window))
            .map_err(TransportError::Bind)?;
        log::debug!("[udp] bound {:?}, peer {remote}", socket.local_addr());
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<usize, TransportError> {
        let datagram = Request::new(message).encode()?;
        let n = self
            .socket()?
            .send(&datagram)
            .map_err(TransportError::Send)?;
        log::debug!("[udp] → {message:?} ({n} bytes)");
        Ok(n)
    }

    fn receive(&mut self) -> Result<Inbound, TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let n = match self.socket()?.recv(&mut buf) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                log::warn!("[udp] no response within {:?}", self.window);
                return Ok(Inbound::Closed);
            }
            Err(e) => return Err(TransportError::Receive(e)),
        };
        if n == 0 {
            log::debug!("[udp] ← empty datagram");
            return Ok(Inbound::Closed);
        }
        let response = Response::decode(&buf[..n])?;
        log::debug!("[udp] ← {:?} {} byte(s)", response.status, response.payload.len());
        Ok(Inbound::Message(response.into_text()?))
    }

    fn farewell(&mut self) -> Result<Option<String>, TransportError> {
        // The binary dialect has no termination message.
        self.socket()?;
        Ok(None)
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            log::debug!("[udp] closed");
        }
    }
}
