//! Message bus adapters.

mod memory;
mod nats;

pub use memory::InMemoryBus;
pub use nats::NatsBus;

/// Deliveries buffered per subscription before the forwarder waits.
const SUBSCRIPTION_BUFFER: usize = 256;
