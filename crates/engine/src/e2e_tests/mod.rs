//! End-to-end tests of the gateway.
//!
//! Requests travel the full production path: typed client, in-memory bus,
//! gateway, handlers, repository, Turso HTTP client with throttle and retries,
//! and a fake pipeline endpoint served by wiremock. No external services are
//! needed, so these run with the normal test suite:
//!
//! ```bash
//! cargo test -p krazyplanet-engine --lib e2e_tests
//! ```

mod exchange_flow_tests;
