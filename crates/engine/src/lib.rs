//! Krazy Planet engine library.
//!
//! Bridges the game's NATS requests to a Turso database.
//!
//! ## Structure
//!
//! - `infrastructure/` - Ports and adapters (Turso HTTP, NATS, health, config)
//! - `repositories/` - Entity operations over the repository ports
//! - `api/` - Bus entry points: gateway, handlers and a typed client
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod repositories;

/// Test fixtures module for integration testing.
#[cfg(test)]
pub mod test_fixtures;

/// E2E tests over the in-memory bus and a fake Turso server.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
