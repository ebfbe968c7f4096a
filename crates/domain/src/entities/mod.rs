//! Domain entities

mod exchange;

pub use exchange::Exchange;
