//! Connection throttle for outbound store calls.
//!
//! Caps how many HTTP requests to the store are in flight at once. Waiters
//! suspend on the semaphore; a slot is returned when its guard is dropped,
//! whatever path the caller leaves by.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::infrastructure::ports::SqlError;

/// Default number of concurrent store connections.
pub const DEFAULT_CAPACITY: usize = 10;

pub struct ConnectionThrottle {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held connection slot; released on drop.
#[derive(Debug)]
pub struct ConnectionSlot {
    _permit: OwnedSemaphorePermit,
}

impl ConnectionThrottle {
    /// Create a throttle with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<ConnectionSlot, SqlError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SqlError::ThrottleClosed)?;
        Ok(ConnectionSlot { _permit: permit })
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConnectionThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
