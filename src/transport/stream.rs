//! Stream transport: blocking TCP carrying the textual dialect.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::{resolve, Inbound, Transport, TransportError, TransportKind};
use crate::packet::{encode_line, LineBuffer, BYE};

/// Read chunk size; lines longer than this are reassembled across reads.
const READ_CHUNK: usize = 1024;

/// How long the termination exchange waits for the server's `BYE`.
const FAREWELL_WINDOW: Duration = Duration::from_secs(2);

/// A TCP connection speaking newline-terminated messages.
#[derive(Debug, Default)]
pub struct StreamTransport {
    stream: Option<TcpStream>,
    lines: LineBuffer,
}

impl StreamTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotOpen)
    }

    /// Read until a full line is buffered or the peer closes.
    ///
    /// `Ok(None)` means the peer closed; a partial line at that point is
    /// discarded.
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.lines.next_line()? {
                log::debug!("[tcp] ← {line:?}");
                return Ok(Some(line));
            }
            let n = match self.stream()?.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Receive(e)),
            };
            if n == 0 {
                if self.lines.pending_len() > 0 {
                    log::warn!(
                        "[tcp] peer closed mid-message; dropping {} byte(s)",
                        self.lines.pending_len()
                    );
                    self.lines.clear();
                }
                log::debug!("[tcp] ← EOF");
                return Ok(None);
            }
            self.lines.extend(&chunk[..n]);
        }
    }
}

impl Transport for StreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let addrs = resolve(host, port)?;
        let stream = TcpStream::connect(&addrs[..]).map_err(|source| TransportError::Connect {
            target: format!("{host}:{port}"),
            source,
        })?;
        log::debug!("[tcp] connected {:?} → {:?}", stream.local_addr(), stream.peer_addr());
        self.stream = Some(stream);
        self.lines.clear();
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<usize, TransportError> {
        let bytes = encode_line(message);
        // write_all loops over short writes until the kernel has everything.
        self.stream()?
            .write_all(&bytes)
            .map_err(TransportError::Send)?;
        log::debug!("[tcp] → {message:?} ({} bytes)", bytes.len());
        Ok(bytes.len())
    }

    fn receive(&mut self) -> Result<Inbound, TransportError> {
        Ok(match self.read_line()? {
            None => Inbound::Closed,
            Some(line) if line == BYE => Inbound::Farewell(line),
            Some(line) => Inbound::Message(line),
        })
    }

    fn farewell(&mut self) -> Result<Option<String>, TransportError> {
        self.send(BYE)?;
        self.stream()?
            .set_read_timeout(Some(FAREWELL_WINDOW))
            .map_err(TransportError::Receive)?;
        match self.read_line() {
            Ok(reply) => Ok(reply),
            Err(TransportError::Receive(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                log::debug!("[tcp] no BYE within {FAREWELL_WINDOW:?}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; the descriptor is released on drop either way.
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("[tcp] closed");
        }
    }
}
