//! Request handlers for the three gateway subjects.
//!
//! [`MessageRouter::handle`] turns one raw delivery into exactly one
//! [`GameResponse`]. It never fails: decode problems become BadRequest,
//! validation problems InvalidData and store problems DatabaseError or
//! InternalError.

use std::sync::Arc;

use krazyplanet_shared::responses::text;
use krazyplanet_shared::{
    subjects, CreateExchangeRequest, ExchangeCreatedData, ExchangeData, ExchangeFoundData,
    ExchangeListData, GameMessage, GameResponse, HealthData, MessageType, QueryExchangeRequest,
    ResponseStatus,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::error_sanitizer::{sanitize_error, sanitize_repo_error};
use crate::infrastructure::correlation::CorrelationId;
use crate::infrastructure::ports::{ClockPort, MessageBus};
use crate::repositories::ExchangeRepository;

pub struct MessageRouter {
    exchanges: Arc<ExchangeRepository>,
    clock: Arc<dyn ClockPort>,
    bus: Arc<dyn MessageBus>,
    service_name: String,
}

impl MessageRouter {
    pub fn new(
        exchanges: Arc<ExchangeRepository>,
        clock: Arc<dyn ClockPort>,
        bus: Arc<dyn MessageBus>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            exchanges,
            clock,
            bus,
            service_name: service_name.into(),
        }
    }

    /// Produce the response for one message received on `subject`.
    pub async fn handle(
        &self,
        subject: &str,
        payload: &[u8],
        correlation_id: &CorrelationId,
    ) -> GameResponse {
        self.route(subject, payload, correlation_id)
            .await
            .with_timestamp(self.clock.now())
    }

    async fn route(
        &self,
        subject: &str,
        payload: &[u8],
        correlation_id: &CorrelationId,
    ) -> GameResponse {
        if subject == subjects::HEALTH_CHECK {
            return self.health_check(payload).await;
        }

        let envelope: GameMessage = match serde_json::from_slice(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    subject = %subject,
                    correlation_id = %correlation_id.short(),
                    error = %e,
                    "Undecodable message"
                );
                return bad_request(Uuid::new_v4().to_string());
            }
        };

        if envelope.message_type != MessageType::Unknown
            && envelope.message_type.subject() != Some(subject)
        {
            tracing::warn!(
                subject = %subject,
                message_type = ?envelope.message_type,
                message_id = %envelope.message_id,
                "Message type does not match subject, routing by subject"
            );
        }

        match subject {
            subjects::EXCHANGE_CREATE => self.create_exchange(envelope, correlation_id).await,
            subjects::EXCHANGE_QUERY => self.query_exchange(envelope, correlation_id).await,
            other => {
                tracing::warn!(subject = %other, "No handler for subject");
                bad_request(envelope.message_id)
            }
        }
    }

    async fn create_exchange(
        &self,
        envelope: GameMessage,
        correlation_id: &CorrelationId,
    ) -> GameResponse {
        let message_id = envelope.message_id.clone();
        let Some(request) = typed_data::<CreateExchangeRequest>(envelope) else {
            return bad_request(message_id);
        };

        let exchange = match request.into_exchange(self.clock.now()) {
            Ok(exchange) => exchange,
            Err(e) => {
                tracing::info!(message_id = %message_id, reason = %e, "Rejected exchange");
                return GameResponse::new(
                    message_id,
                    ResponseStatus::InvalidData,
                    text::MISSING_PLAYERS,
                );
            }
        };

        match self.exchanges.record(&exchange).await {
            Ok(stored) => {
                tracing::info!(
                    message_id = %message_id,
                    exchange_id = %stored.id(),
                    opener = %stored.opener(),
                    follower = %stored.follower(),
                    "Exchange created"
                );
                GameResponse::new(message_id, ResponseStatus::Success, text::EXCHANGE_CREATED)
                    .with_data(ExchangeCreatedData {
                        exchange_id: stored.id().as_i64(),
                        created_at: stored.occurred_at(),
                    })
            }
            Err(e) if e.is_database() => {
                let message = sanitize_repo_error(
                    &e,
                    "insert_exchange",
                    correlation_id,
                    text::EXCHANGE_CREATE_FAILED,
                );
                GameResponse::new(message_id, ResponseStatus::DatabaseError, message)
            }
            Err(e) => {
                let message = sanitize_error(&e, "exchange.create", correlation_id);
                GameResponse::new(message_id, ResponseStatus::InternalError, message)
            }
        }
    }

    async fn query_exchange(
        &self,
        envelope: GameMessage,
        correlation_id: &CorrelationId,
    ) -> GameResponse {
        let message_id = envelope.message_id.clone();
        let Some(request) = typed_data::<QueryExchangeRequest>(envelope) else {
            return bad_request(message_id);
        };

        match request.target() {
            Some(id) => match self.exchanges.get(id).await {
                Ok(Some(exchange)) => {
                    GameResponse::new(message_id, ResponseStatus::Success, text::EXCHANGE_FOUND)
                        .with_data(ExchangeFoundData {
                            exchange: ExchangeData::from(&exchange),
                        })
                }
                Ok(None) => {
                    tracing::debug!(message_id = %message_id, exchange_id = %id, "Exchange not found");
                    GameResponse::new(
                        message_id,
                        ResponseStatus::NotFound,
                        text::EXCHANGE_NOT_FOUND,
                    )
                }
                Err(e) => {
                    let message = sanitize_error(&e, "exchange.query", correlation_id);
                    GameResponse::new(message_id, ResponseStatus::InternalError, message)
                }
            },
            None => match self.exchanges.list().await {
                Ok(exchanges) => GameResponse::new(
                    message_id,
                    ResponseStatus::Success,
                    text::exchanges_found(exchanges.len()),
                )
                .with_data(ExchangeListData {
                    exchanges: exchanges.iter().map(ExchangeData::from).collect(),
                }),
                Err(e) => {
                    let message = sanitize_error(&e, "exchange.query", correlation_id);
                    GameResponse::new(message_id, ResponseStatus::InternalError, message)
                }
            },
        }
    }

    /// Always answers; the body is read only to echo the message id.
    async fn health_check(&self, payload: &[u8]) -> GameResponse {
        let message_id = peek_message_id(payload).unwrap_or_else(|| Uuid::new_v4().to_string());

        GameResponse::new(message_id, ResponseStatus::Success, text::SERVICE_HEALTHY).with_data(
            HealthData {
                service: self.service_name.clone(),
                status: "running".to_string(),
                timestamp: self.clock.now(),
                nats_connected: self.bus.is_connected().await,
            },
        )
    }
}

/// `messageId` of a payload that may not decode as a full envelope.
pub(crate) fn peek_message_id(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    value
        .get("messageId")
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

/// Decode the `data` of an envelope; `None` when missing or mis-shaped.
fn typed_data<T: DeserializeOwned>(envelope: GameMessage) -> Option<T> {
    let message_id = envelope.message_id;
    let data = envelope.data?;
    match serde_json::from_value(data) {
        Ok(typed) => Some(typed),
        Err(e) => {
            tracing::warn!(message_id = %message_id, error = %e, "Message data has the wrong shape");
            None
        }
    }
}

fn bad_request(message_id: String) -> GameResponse {
    GameResponse::new(
        message_id,
        ResponseStatus::BadRequest,
        text::INVALID_MESSAGE_FORMAT,
    )
}
