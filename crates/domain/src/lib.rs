//! Krazy Planet Domain
//!
//! Core domain types for the exchange gateway. No I/O, no async, no wire
//! formats: only the Exchange entity, its id and the domain error.

pub mod entities;
pub mod error;
pub mod ids;

pub use entities::Exchange;
pub use error::DomainError;
pub use ids::ExchangeId;
