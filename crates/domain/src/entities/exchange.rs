//! Exchange Entity
//!
//! A card trade between two players: the opener proposes, the follower
//! answers, each side puts one card on the table. Exchanges are written once
//! and never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ExchangeId;

/// A recorded card trade between two players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    /// Store-assigned id; `ExchangeId::UNASSIGNED` until inserted
    id: ExchangeId,
    /// Player who opened the trade request
    opener: String,
    /// Player who answered the trade request
    follower: String,
    /// Card offered by the opener (may be empty)
    opener_card: String,
    /// Card offered by the follower (may be empty)
    follower_card: String,
    /// When the trade happened
    occurred_at: DateTime<Utc>,
}

impl Exchange {
    /// Create a new, not yet persisted exchange.
    ///
    /// `opener` and `follower` must contain something other than whitespace.
    /// Cards are optional and stored as given.
    pub fn new(
        opener: impl Into<String>,
        follower: impl Into<String>,
        opener_card: impl Into<String>,
        follower_card: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let opener = opener.into();
        let follower = follower.into();

        if opener.trim().is_empty() || follower.trim().is_empty() {
            return Err(DomainError::validation(
                "Exchange requires both an opener and a follower",
            ));
        }

        Ok(Self {
            id: ExchangeId::UNASSIGNED,
            opener,
            follower,
            opener_card: opener_card.into(),
            follower_card: follower_card.into(),
            occurred_at,
        })
    }

    /// Reconstruct an Exchange from stored data.
    ///
    /// No validation: rows already in the store are returned as they are.
    pub fn from_stored(
        id: ExchangeId,
        opener: String,
        follower: String,
        opener_card: String,
        follower_card: String,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            opener,
            follower,
            opener_card,
            follower_card,
            occurred_at,
        }
    }

    /// Return the same exchange carrying the store-assigned id.
    pub fn with_id(mut self, id: ExchangeId) -> Self {
        self.id = id;
        self
    }

    // Read accessors

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn opener(&self) -> &str {
        &self.opener
    }

    pub fn follower(&self) -> &str {
        &self.follower
    }

    pub fn opener_card(&self) -> &str {
        &self.opener_card
    }

    pub fn follower_card(&self) -> &str {
        &self.follower_card
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_assigned()
    }
}
