//! Typed request payloads, one per subject
//!
//! These are the `data` part of a [`crate::GameMessage`]. Decoding is forgiving
//! about scalar types (see [`crate::de`]) but the payload itself must be a JSON
//! object.

use chrono::{DateTime, Utc};
use krazyplanet_domain::{DomainError, Exchange, ExchangeId};
use serde::{Deserialize, Deserializer, Serialize};

use crate::de::object_only;

/// Field layouts as they appear on the wire.
mod fields {
    use serde::Deserialize;

    use crate::de::{lenient_i64, lenient_string};

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct CreateExchange {
        #[serde(default, deserialize_with = "lenient_string")]
        pub opener: String,
        #[serde(default, deserialize_with = "lenient_string")]
        pub follower: String,
        #[serde(default, deserialize_with = "lenient_string")]
        pub opener_card: String,
        #[serde(default, deserialize_with = "lenient_string")]
        pub follower_card: String,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct QueryExchange {
        #[serde(default, deserialize_with = "lenient_i64")]
        pub exchange_id: Option<i64>,
    }
}

/// Payload of `game.exchange.create`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRequest {
    pub opener: String,
    pub follower: String,
    pub opener_card: String,
    pub follower_card: String,
}

impl<'de> Deserialize<'de> for CreateExchangeRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: fields::CreateExchange = object_only(deserializer)?;
        Ok(Self::new(
            raw.opener,
            raw.follower,
            raw.opener_card,
            raw.follower_card,
        ))
    }
}

impl CreateExchangeRequest {
    pub fn new(
        opener: impl Into<String>,
        follower: impl Into<String>,
        opener_card: impl Into<String>,
        follower_card: impl Into<String>,
    ) -> Self {
        Self {
            opener: opener.into(),
            follower: follower.into(),
            opener_card: opener_card.into(),
            follower_card: follower_card.into(),
        }
    }

    /// Build the unpersisted exchange this request describes.
    ///
    /// Fails with a validation error when opener or follower is missing.
    pub fn into_exchange(self, now: DateTime<Utc>) -> Result<Exchange, DomainError> {
        Exchange::new(
            self.opener,
            self.follower,
            self.opener_card,
            self.follower_card,
            now,
        )
    }
}

/// Payload of `game.exchange.query`
///
/// Without an id (or with one that is not an integer) the query lists every
/// exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExchangeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<i64>,
}

impl<'de> Deserialize<'de> for QueryExchangeRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: fields::QueryExchange = object_only(deserializer)?;
        Ok(Self {
            exchange_id: raw.exchange_id,
        })
    }
}

impl QueryExchangeRequest {
    pub fn all() -> Self {
        Self { exchange_id: None }
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            exchange_id: Some(id),
        }
    }

    pub fn target(&self) -> Option<ExchangeId> {
        self.exchange_id.map(ExchangeId::new)
    }
}

/// Payload of `game.health.check`; any content is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckRequest {}
