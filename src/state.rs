//! Session finite-state machine types.
//!
//! Transitions live in [`crate::session`]; this module only names the states.
//!
//! ```text
//!  INITIAL ──connect──▶ UP ──disconnect / BYE──▶ DOWN
//!     │                  │
//!     └──────┬───────────┘
//!            ▼
//!         ERRORED
//! ```
//!
//! `DOWN` and `ERRORED` are terminal.

/// All possible states of a [`crate::session::Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Constructed; transport not yet open.
    #[default]
    Initial,
    /// Transport open; requests may be exchanged.
    Up,
    /// Clean shutdown.
    Down,
    /// Abnormal shutdown; the session holds the cause.
    Errored,
}

impl SessionState {
    /// `true` for `Down` and `Errored`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Down | Self::Errored)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial => "INITIAL",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Errored => "ERRORED",
        };
        f.write_str(name)
    }
}
