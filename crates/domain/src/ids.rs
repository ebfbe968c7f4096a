use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned identifier of an exchange.
///
/// The Turso table uses `INTEGER PRIMARY KEY AUTOINCREMENT`, so ids are plain
/// row ids. `0` is never handed out by the store and marks an exchange that
/// has not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(i64);

impl ExchangeId {
    pub const UNASSIGNED: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ExchangeId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ExchangeId> for i64 {
    fn from(value: ExchangeId) -> Self {
        value.0
    }
}
