//! Inbound message envelope
//!
//! Every request published by the game client has the same outer shape:
//!
//! ```json
//! {
//!   "messageId": "5f0c…",
//!   "messageType": "exchange.create",
//!   "playerId": "player-1",
//!   "data": { … },
//!   "timestamp": "2025-03-14T09:26:53Z"
//! }
//! ```
//!
//! `data` is generic so the engine can first read the envelope with a raw
//! `serde_json::Value` payload (to recover the `messageId`) and then decode the
//! payload into the typed request for the subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::de::lenient_timestamp;
use crate::subjects;

fn fresh_message_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Message Type
// =============================================================================

/// Kind of request carried by a [`GameMessage`]
///
/// Unknown values deserialize to `Unknown` for forward compatibility. The
/// gateway routes by subject, so the type is informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "exchange.create")]
    ExchangeCreate,
    #[serde(rename = "exchange.query")]
    ExchangeQuery,
    #[serde(rename = "health.check")]
    HealthCheck,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MessageType {
    /// The bus subject this message type is published on
    pub fn subject(&self) -> Option<&'static str> {
        match self {
            MessageType::ExchangeCreate => Some(subjects::EXCHANGE_CREATE),
            MessageType::ExchangeQuery => Some(subjects::EXCHANGE_QUERY),
            MessageType::HealthCheck => Some(subjects::HEALTH_CHECK),
            MessageType::Unknown => None,
        }
    }

    /// Inverse of [`MessageType::subject`]
    pub fn for_subject(subject: &str) -> Self {
        match subject {
            subjects::EXCHANGE_CREATE => MessageType::ExchangeCreate,
            subjects::EXCHANGE_QUERY => MessageType::ExchangeQuery,
            subjects::HEALTH_CHECK => MessageType::HealthCheck,
            _ => MessageType::Unknown,
        }
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// A request published by the game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMessage<T = serde_json::Value> {
    /// Correlates the request with its response; echoed back unchanged
    #[serde(default = "fresh_message_id")]
    pub message_id: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub player_id: String,
    /// Request payload; `None` when absent or `null`
    pub data: Option<T>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl<T> GameMessage<T> {
    /// Build an outgoing message with a fresh id and the current time
    pub fn new(message_type: MessageType, player_id: impl Into<String>, data: T) -> Self {
        Self {
            message_id: fresh_message_id(),
            message_type,
            player_id: player_id.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }
}
