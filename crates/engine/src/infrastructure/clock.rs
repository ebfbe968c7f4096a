//! Clocks that stamp exchanges and responses.
//!
//! `ExchangeTable.date` holds whole seconds, so the wall clock drops the
//! sub-second part. An exchange read back then carries the same timestamp
//! its create reply reported.

use chrono::{DateTime, SubsecRound, Utc};

use crate::infrastructure::ports::ClockPort;

/// Wall clock at the store's one-second resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
