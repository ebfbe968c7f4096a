//! Response types for the bus request/reply pattern
//!
//! Every request gets exactly one [`GameResponse`], published on the reply
//! subject of the request. The numeric `statusCode` follows HTTP conventions,
//! with two extra codes for store failures and payload validation.

use chrono::{DateTime, Utc};
use krazyplanet_domain::Exchange;
use serde::{Deserialize, Serialize};

// =============================================================================
// Status codes
// =============================================================================

/// Outcome classification of a request, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ResponseStatus {
    Success,
    /// Message could not be decoded
    BadRequest,
    /// Requested exchange does not exist
    NotFound,
    /// Unexpected failure; detail is only logged
    InternalError,
    /// The store rejected or never answered the write
    DatabaseError,
    /// Message decoded but its content is unusable
    InvalidData,
}

impl ResponseStatus {
    pub fn code(&self) -> u16 {
        match self {
            ResponseStatus::Success => 200,
            ResponseStatus::BadRequest => 400,
            ResponseStatus::NotFound => 404,
            ResponseStatus::InternalError => 500,
            ResponseStatus::DatabaseError => 501,
            ResponseStatus::InvalidData => 422,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseStatus::Success)
    }
}

impl From<ResponseStatus> for u16 {
    fn from(status: ResponseStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for ResponseStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(ResponseStatus::Success),
            400 => Ok(ResponseStatus::BadRequest),
            404 => Ok(ResponseStatus::NotFound),
            500 => Ok(ResponseStatus::InternalError),
            501 => Ok(ResponseStatus::DatabaseError),
            422 => Ok(ResponseStatus::InvalidData),
            other => Err(UnknownStatusCode(other)),
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown response status code: {0}")]
pub struct UnknownStatusCode(pub u16);

/// Client-facing response texts.
pub mod text {
    pub const INVALID_MESSAGE_FORMAT: &str = "Invalid message format";
    pub const MISSING_PLAYERS: &str = "Missing required fields: opener and follower";
    pub const EXCHANGE_CREATED: &str = "Exchange created successfully";
    pub const EXCHANGE_CREATE_FAILED: &str = "Failed to create exchange in database";
    pub const INTERNAL_ERROR: &str = "Internal server error";
    pub const EXCHANGE_FOUND: &str = "Exchange found";
    pub const EXCHANGE_NOT_FOUND: &str = "Exchange not found";
    pub const SERVICE_HEALTHY: &str = "Service is healthy";

    pub fn exchanges_found(count: usize) -> String {
        format!("Found {} exchanges", count)
    }
}

// =============================================================================
// Response envelope
// =============================================================================

/// Reply to a [`crate::GameMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    /// `messageId` of the request, or a fresh id when it could not be read
    pub message_id: String,
    pub status_code: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl GameResponse {
    pub fn new(
        message_id: impl Into<String>,
        status_code: ResponseStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            status_code,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a data payload. A payload that cannot be encoded is logged and
    /// left off.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => self.data = Some(value),
            Err(e) => {
                tracing::error!(
                    message_id = %self.message_id,
                    error = %e,
                    "Failed to encode response data"
                );
                self.data = None;
            }
        }
        self
    }

    /// Stamp the response with the responder's clock
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// Decode the data payload into a typed view
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.data
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

// =============================================================================
// Typed data payloads
// =============================================================================

/// Wire view of an exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeData {
    pub id: i64,
    pub opener: String,
    pub follower: String,
    pub opener_card: String,
    pub follower_card: String,
    pub date: DateTime<Utc>,
}

impl From<&Exchange> for ExchangeData {
    fn from(exchange: &Exchange) -> Self {
        Self {
            id: exchange.id().as_i64(),
            opener: exchange.opener().to_string(),
            follower: exchange.follower().to_string(),
            opener_card: exchange.opener_card().to_string(),
            follower_card: exchange.follower_card().to_string(),
            date: exchange.occurred_at(),
        }
    }
}

/// Data of a successful `exchange.create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCreatedData {
    pub exchange_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Data of an `exchange.query` by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFoundData {
    pub exchange: ExchangeData,
}

/// Data of an `exchange.query` without id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeListData {
    pub exchanges: Vec<ExchangeData>,
}

/// Data of a `health.check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub service: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub nats_connected: bool,
}
