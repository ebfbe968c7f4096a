//! API layer - bus entry points.

pub mod client;
pub mod error_sanitizer;
pub mod gateway;
pub mod handlers;

pub use client::{ClientError, GameClient};
pub use gateway::{GatewayError, GatewayState, MessageGateway};
pub use handlers::MessageRouter;
