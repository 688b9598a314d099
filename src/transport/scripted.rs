//! In-memory transport for unit tests.
//!
//! Replies are served from a script; every call is recorded in a shared
//! [`Calls`] log so tests can inspect it after the session owns the
//! transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use super::{Inbound, Transport, TransportError, TransportKind};

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub opens: usize,
    pub sent: Vec<String>,
    pub receives: usize,
    pub farewells: usize,
    pub closes: usize,
}

pub(crate) struct ScriptedTransport {
    pub calls: Rc<RefCell<Calls>>,
    pub fail_open: bool,
    pub fail_send: bool,
    pub fail_farewell: bool,
    pub replies: VecDeque<Result<Inbound, TransportError>>,
    pub farewell_reply: Option<String>,
    open: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            calls: Rc::default(),
            fail_open: false,
            fail_send: false,
            fail_farewell: false,
            replies: VecDeque::new(),
            farewell_reply: Some("BYE".into()),
            open: false,
        }
    }

    pub fn reply(mut self, inbound: Inbound) -> Self {
        self.replies.push_back(Ok(inbound));
        self
    }

    pub fn reply_error(mut self, e: io::ErrorKind) -> Self {
        self.replies
            .push_back(Err(TransportError::Receive(io::Error::from(e))));
        self
    }

    pub fn calls(&self) -> Rc<RefCell<Calls>> {
        Rc::clone(&self.calls)
    }
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.calls.borrow_mut().opens += 1;
        if self.fail_open {
            return Err(TransportError::Connect {
                target: format!("{host}:{port}"),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        self.open = true;
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<usize, TransportError> {
        assert!(self.open, "send on a transport that is not open");
        if self.fail_send {
            return Err(TransportError::Send(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        self.calls.borrow_mut().sent.push(message.to_string());
        Ok(message.len() + 1)
    }

    fn receive(&mut self) -> Result<Inbound, TransportError> {
        assert!(self.open, "receive on a transport that is not open");
        self.calls.borrow_mut().receives += 1;
        self.replies.pop_front().unwrap_or(Ok(Inbound::Closed))
    }

    fn farewell(&mut self) -> Result<Option<String>, TransportError> {
        assert!(self.open, "farewell on a transport that is not open");
        self.calls.borrow_mut().farewells += 1;
        if self.fail_farewell {
            return Err(TransportError::Send(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        Ok(self.farewell_reply.clone())
    }

    fn close(&mut self) {
        assert!(self.open, "transport released twice");
        self.open = false;
        self.calls.borrow_mut().closes += 1;
    }
}
