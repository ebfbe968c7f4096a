//! Exchange entity operations.

use std::sync::Arc;

use krazyplanet_domain::{Exchange, ExchangeId};

use crate::infrastructure::ports::{ExchangeRepo, RepoError};

/// Exchange entity operations.
pub struct ExchangeRepository {
    repo: Arc<dyn ExchangeRepo>,
}

impl ExchangeRepository {
    pub fn new(repo: Arc<dyn ExchangeRepo>) -> Self {
        Self { repo }
    }

    /// Make sure the backing table exists. Run once at startup.
    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        self.repo.create_table().await
    }

    /// Store a new exchange and return it with its id.
    pub async fn record(&self, exchange: &Exchange) -> Result<Exchange, RepoError> {
        self.repo.insert(exchange).await
    }

    pub async fn get(&self, id: ExchangeId) -> Result<Option<Exchange>, RepoError> {
        self.repo.fetch_by_id(id).await
    }

    /// All exchanges, most recent first.
    pub async fn list(&self) -> Result<Vec<Exchange>, RepoError> {
        self.repo.fetch_all().await
    }
}
