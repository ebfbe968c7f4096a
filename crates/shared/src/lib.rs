//! Krazy Planet Shared - wire contracts between the game and the gateway
//!
//! This crate contains everything both sides of the bus agree on:
//! - Subject names
//! - The inbound message envelope and typed request payloads
//! - The response envelope, status codes and typed response data
//!
//! # Design Principles
//!
//! 1. **No I/O** - pure data types and serialization
//! 2. **Forgiving input** - scalar payload fields are coerced, not rejected
//! 3. **Strict output** - responses always carry a known status code

pub mod de;
pub mod messages;
pub mod requests;
pub mod responses;
pub mod subjects;

pub use messages::{GameMessage, MessageType};
pub use requests::{CreateExchangeRequest, HealthCheckRequest, QueryExchangeRequest};
pub use responses::{
    ExchangeCreatedData, ExchangeData, ExchangeFoundData, ExchangeListData, GameResponse,
    HealthData, ResponseStatus,
};
