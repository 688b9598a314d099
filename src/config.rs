//! Client configuration: target endpoint and transport mode.

use std::str::FromStr;

use crate::transport::TransportKind;

/// User-facing transport token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Tcp,
    Udp,
}

impl Mode {
    pub fn transport_kind(self) -> TransportKind {
        match self {
            Mode::Tcp => TransportKind::Stream,
            Mode::Udp => TransportKind::Datagram,
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Mode::Tcp),
            "udp" => Ok(Mode::Udp),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Tcp => f.write_str("tcp"),
            Mode::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Host not specified!")]
    MissingHost,
    #[error("Port not specified!")]
    MissingPort,
    #[error("Invalid mode '{0}', expected tcp or udp!")]
    InvalidMode(String),
}

/// Everything needed to build a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, mode: Mode) -> Self {
        Self {
            host: host.into(),
            port,
            mode,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.port == 0 {
            return Err(ConfigError::MissingPort);
        }
        Ok(())
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.mode.transport_kind()
    }
}
