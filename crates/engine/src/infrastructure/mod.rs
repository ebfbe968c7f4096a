//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod bus;
pub mod cache;
pub mod clock;
pub mod config;
pub mod correlation;
pub mod health;
pub mod ports;
pub mod resilient_http;
pub mod throttle;
pub mod turso;
