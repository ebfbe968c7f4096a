//! NATS subjects served by the gateway

/// Create a new exchange
pub const EXCHANGE_CREATE: &str = "game.exchange.create";
/// Fetch one exchange by id, or all of them
pub const EXCHANGE_QUERY: &str = "game.exchange.query";
/// Liveness probe answered without touching the store
pub const HEALTH_CHECK: &str = "game.health.check";

/// Every subject the gateway subscribes to, in subscription order.
pub const ALL: [&str; 3] = [EXCHANGE_CREATE, EXCHANGE_QUERY, HEALTH_CHECK];
