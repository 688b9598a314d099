//! Interrupt token for graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag raised by Ctrl-C (or end of input) and polled by the driving loop
/// between requests.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token and register a Ctrl-C handler that raises it.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let interrupt = Self::new();
        let handle = interrupt.clone();
        ctrlc::set_handler(move || {
            handle.raise();
        })?;
        Ok(interrupt)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
