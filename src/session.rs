//! Client session: lifecycle state machine over one transport.
//!
//! A [`Session`] owns the complete state of one logical exchange with an
//! IPKCP server.  Its responsibilities are:
//! - Driving the state machine (see [`crate::state`]).
//! - Classifying failures into [`SessionError`] and remembering the cause.
//! - Releasing the transport exactly once when leaving `UP`.
//!
//! The session never looks at the transport kind after construction; all
//! framing differences live behind [`Transport`].

use crate::state::SessionState;
use crate::transport::{self, Inbound, Transport, TransportError, TransportKind};

/// Failure classes surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Bad construction parameters; no socket was touched.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The transport could not be opened.
    #[error("{0}")]
    Connection(TransportError),
    /// A send or receive failed while `UP`.
    #[error("{0}")]
    Transport(TransportError),
    /// The operation needs `UP`; the session was elsewhere.
    #[error("session is {0}, not UP")]
    NotUp(SessionState),
}

/// One client session with an IPKCP server.
pub struct Session {
    host: String,
    port: u16,
    kind: TransportKind,
    state: SessionState,
    error: Option<String>,
    transport: Option<Box<dyn Transport>>,
}

impl Session {
    /// Create a session for `host:port` over `kind`.
    ///
    /// Invalid parameters put the session straight into `ERRORED`.
    pub fn new(host: &str, port: u16, kind: TransportKind) -> Self {
        Self::with_transport(host, port, transport::for_kind(kind))
    }

    /// Create a session over a caller-supplied transport.
    pub fn with_transport(host: &str, port: u16, transport: Box<dyn Transport>) -> Self {
        let mut session = Self {
            host: host.to_string(),
            port,
            kind: transport.kind(),
            state: SessionState::Initial,
            error: None,
            transport: Some(transport),
        };
        if let Err(e) = validate(host, port) {
            session.transport = None;
            session.fail(e);
        }
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Cause of the last failure; `None` unless the session is `ERRORED`.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Open the transport.  Valid only from `INITIAL`.
    ///
    /// Returns `true` on success; callers should still consult
    /// [`Session::state`].
    pub fn connect(&mut self) -> bool {
        if self.state != SessionState::Initial {
            log::warn!("connect() called in state {}", self.state);
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            self.fail(SessionError::Connection(TransportError::NotOpen));
            return false;
        };
        match transport.open(&self.host, self.port) {
            Ok(()) => {
                self.transition(SessionState::Up);
                true
            }
            Err(e) => {
                // Never opened, so there is nothing to close.
                self.transport = None;
                self.fail(SessionError::Connection(e));
                false
            }
        }
    }

    /// Send one line as one message.  Returns the number of bytes sent.
    pub fn send(&mut self, line: &str) -> Result<usize, SessionError> {
        let transport = self.up_transport()?;
        match transport.send(line) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail_transport(e)),
        }
    }

    /// Receive one reply.
    ///
    /// An empty string means the peer has ended the session; the caller is
    /// expected to follow up with [`Session::disconnect`].  A server-sent
    /// `BYE` is returned as text and moves the session to `DOWN`.
    pub fn receive(&mut self) -> Result<String, SessionError> {
        let transport = self.up_transport()?;
        match transport.receive() {
            Ok(Inbound::Message(text)) => Ok(text),
            Ok(Inbound::Closed) => Ok(String::new()),
            Ok(Inbound::Farewell(text)) => {
                log::debug!("server ended the session");
                self.release();
                self.transition(SessionState::Down);
                Ok(text)
            }
            Err(e) => Err(self.fail_transport(e)),
        }
    }

    /// End the session gracefully and return a status line for display.
    ///
    /// From `UP` this runs the termination exchange, closes the transport
    /// and moves to `DOWN`; failures while notifying the peer are logged and
    /// dropped.  From `INITIAL` it moves to `DOWN`.  From `DOWN` or
    /// `ERRORED` it does nothing and returns an empty string.
    pub fn disconnect(&mut self) -> String {
        match self.state {
            SessionState::Down | SessionState::Errored => return String::new(),
            SessionState::Initial => {
                self.transport = None;
                self.transition(SessionState::Down);
                return String::new();
            }
            SessionState::Up => {}
        }

        let status = match self.transport.as_mut().map(|t| t.farewell()) {
            Some(Ok(reply)) => reply.unwrap_or_default(),
            Some(Err(e)) => {
                log::warn!("termination exchange failed: {e}");
                String::new()
            }
            None => String::new(),
        };
        self.release();
        self.transition(SessionState::Down);
        status
    }

    fn up_transport(&mut self) -> Result<&mut Box<dyn Transport>, SessionError> {
        if self.state != SessionState::Up {
            return Err(SessionError::NotUp(self.state));
        }
        self.transport
            .as_mut()
            .ok_or(SessionError::NotUp(self.state))
    }

    fn fail_transport(&mut self, e: TransportError) -> SessionError {
        self.release();
        self.error = Some(e.to_string());
        self.transition(SessionState::Errored);
        SessionError::Transport(e)
    }

    fn fail(&mut self, e: SessionError) {
        self.error = Some(e.to_string());
        self.transition(SessionState::Errored);
    }

    /// Close and drop the transport; a second call finds nothing to close.
    fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("session {} → {}", self.state, next);
        self.state = next;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Up {
            self.release();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

fn validate(host: &str, port: u16) -> Result<(), SessionError> {
    if host.trim().is_empty() {
        return Err(SessionError::Config("host must not be empty".into()));
    }
    if port == 0 {
        return Err(SessionError::Config("port must be in 1..=65535".into()));
    }
    Ok(())
}
