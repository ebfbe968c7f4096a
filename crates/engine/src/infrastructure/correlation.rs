//! Correlation IDs for tracing one bus delivery through the engine.
//!
//! The game's `messageId` is client-controlled and may repeat, so every
//! delivery also gets its own id for log correlation.

use std::fmt;
use uuid::Uuid;

/// Correlation ID for tracking a delivery across the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short format (first 8 characters) for logging.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
