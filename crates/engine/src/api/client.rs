//! Typed request/reply client for the gateway subjects.
//!
//! This is what the game side does over the bus: wrap a typed payload in a
//! [`GameMessage`], publish it with a private reply subject and decode the
//! [`GameResponse`]. Used by operational tooling and the end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use krazyplanet_shared::{
    CreateExchangeRequest, GameMessage, GameResponse, HealthCheckRequest, MessageType,
    QueryExchangeRequest,
};
use serde::Serialize;

use crate::infrastructure::ports::{BusError, MessageBus};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("Failed to encode request: {0}")]
    Encode(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

pub struct GameClient {
    bus: Arc<dyn MessageBus>,
    player_id: String,
    timeout: Duration,
}

impl GameClient {
    pub fn new(bus: Arc<dyn MessageBus>, player_id: impl Into<String>) -> Self {
        Self {
            bus,
            player_id: player_id.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn health_check(&self) -> Result<GameResponse, ClientError> {
        self.send(MessageType::HealthCheck, HealthCheckRequest {})
            .await
    }

    pub async fn create_exchange(
        &self,
        request: CreateExchangeRequest,
    ) -> Result<GameResponse, ClientError> {
        self.send(MessageType::ExchangeCreate, request).await
    }

    pub async fn query_exchange(&self, exchange_id: i64) -> Result<GameResponse, ClientError> {
        self.send(
            MessageType::ExchangeQuery,
            QueryExchangeRequest::by_id(exchange_id),
        )
        .await
    }

    pub async fn query_exchanges(&self) -> Result<GameResponse, ClientError> {
        self.send(MessageType::ExchangeQuery, QueryExchangeRequest::all())
            .await
    }

    /// Send an already encoded body on `subject`.
    pub async fn send_raw(&self, subject: &str, body: Bytes) -> Result<GameResponse, ClientError> {
        let reply = self.bus.request(subject, body, self.timeout).await?;
        serde_json::from_slice(&reply.payload).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send<T: Serialize>(
        &self,
        message_type: MessageType,
        data: T,
    ) -> Result<GameResponse, ClientError> {
        let subject = message_type
            .subject()
            .ok_or_else(|| ClientError::Encode("message type has no subject".into()))?;
        let message = GameMessage::new(message_type, self.player_id.clone(), data);
        let body = serde_json::to_vec(&message).map_err(|e| ClientError::Encode(e.to_string()))?;

        tracing::debug!(subject = %subject, message_id = %message.message_id, "Sending request");
        self.send_raw(subject, Bytes::from(body)).await
    }
}
