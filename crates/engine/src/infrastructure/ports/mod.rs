//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Exchange storage (repository over the SQL store)
//! - The SQL store itself (could swap Turso HTTP -> embedded libSQL)
//! - The message bus (NATS in production, in-memory in tests)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::ExchangeRepo;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{DatabaseMetrics, Delivery, MessageBus, SqlExecutor, Subscription};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockSqlExecutor;
#[cfg(test)]
pub use repos::MockExchangeRepo;
#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{BusError, RepoError, SqlError};
