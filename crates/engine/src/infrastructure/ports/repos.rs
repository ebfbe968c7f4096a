//! Repository port traits for database access.

use async_trait::async_trait;
use krazyplanet_domain::{Exchange, ExchangeId};

use super::error::RepoError;

// =============================================================================
// Exchange Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeRepo: Send + Sync {
    /// Create the exchange table if it does not exist yet.
    async fn create_table(&self) -> Result<(), RepoError>;

    /// Persist a new exchange; returns it carrying the store-assigned id.
    async fn insert(&self, exchange: &Exchange) -> Result<Exchange, RepoError>;

    /// Every exchange, most recent first.
    async fn fetch_all(&self) -> Result<Vec<Exchange>, RepoError>;

    async fn fetch_by_id(&self, id: ExchangeId) -> Result<Option<Exchange>, RepoError>;
}
