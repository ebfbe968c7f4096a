//! Repository modules - Data access wrappers around port traits.
//!
//! Each repository wraps a port trait and provides the interface
//! the message handlers use to reach persisted entities.

pub mod exchange;

pub use exchange::ExchangeRepository;
