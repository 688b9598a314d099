//! `ipkcpc`: a command-line client for the IPKCP calculator protocol.
//!
//! # Architecture
//!
//! ```text
//!   stdin ──lines──▶ driver ──send/receive──▶ Session ──▶ stdout
//!                      ▲                        │
//!                 Interrupt                     │ Box<dyn Transport>
//!                 (Ctrl-C)           ┌──────────┴──────────┐
//!                                    ▼                     ▼
//!                             StreamTransport      DatagramTransport
//!                             (TCP, text lines)    (UDP, binary frames)
//! ```
//!
//! Each module has a single responsibility:
//! - [`config`]:    target endpoint and transport mode
//! - [`packet`]:    wire format of both IPKCP dialects
//! - [`transport`]: uniform open/send/receive/close over TCP and UDP
//! - [`state`]:     session state machine types
//! - [`session`]:   lifecycle, error classification, teardown
//! - [`driver`]:    the line-by-line request loop
//! - [`signal`]:    interrupt token wired to Ctrl-C

pub mod config;
pub mod driver;
pub mod packet;
pub mod session;
pub mod signal;
pub mod state;
pub mod transport;

pub use config::{ClientConfig, ConfigError, Mode};
pub use driver::Outcome;
pub use session::{Session, SessionError};
pub use signal::Interrupt;
pub use state::SessionState;
pub use transport::{Transport, TransportError, TransportKind};
