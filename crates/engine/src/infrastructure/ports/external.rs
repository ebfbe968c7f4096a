//! External service port traits (SQL store, message bus).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{BusError, SqlError};
use crate::infrastructure::turso::PipelineResponse;

// =============================================================================
// SQL Store
// =============================================================================

/// Snapshot of the data access layer for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetrics {
    pub cached_queries: usize,
    pub available_connections: usize,
    pub database_url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run one SQL statement.
    ///
    /// `Ok(None)` means the store could not be reached or answered with an
    /// error; the failure has already been logged. `Err` is reserved for
    /// caller mistakes such as an empty statement.
    async fn execute(&self, sql: &str) -> Result<Option<PipelineResponse>, SqlError>;

    /// Run `SELECT 1`; true when the store answered with at least one result.
    async fn test_connection(&self) -> bool;

    async fn metrics(&self) -> DatabaseMetrics;
}

// =============================================================================
// Message Bus
// =============================================================================

/// One message received on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub subject: String,
    /// Where the requester waits for the answer, if anywhere
    pub reply: Option<String>,
    pub payload: Bytes,
}

/// Live subscription to one subject.
///
/// Deliveries are pushed by a forwarding task owned by the bus adapter.
/// Dropping the subscription stops forwarding; [`Subscription::unsubscribe`]
/// additionally waits until the adapter has released the subject.
pub struct Subscription {
    subject: String,
    deliveries: mpsc::Receiver<Delivery>,
    cancel: CancellationToken,
    forwarder: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(
        subject: impl Into<String>,
        deliveries: mpsc::Receiver<Delivery>,
        cancel: CancellationToken,
        forwarder: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            deliveries,
            cancel,
            forwarder,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next delivery, or `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        self.deliveries.close();
        if let Some(forwarder) = self.forwarder.take() {
            if let Err(e) = forwarder.await {
                tracing::warn!(subject = %self.subject, error = %e, "Subscription forwarder ended abnormally");
            }
        }
        tracing::debug!(subject = %self.subject, "Unsubscribed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError>;

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError>;

    /// Publish with a private reply subject and wait for the first answer.
    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Delivery, BusError>;

    async fn is_connected(&self) -> bool;

    /// Flush and drop the connection. Later calls fail with `BusError::Closed`.
    async fn close(&self) -> Result<(), BusError>;
}
