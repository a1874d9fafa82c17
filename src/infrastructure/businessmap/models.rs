//! Businessmap API envelope and request models.
//!
//! Every v2 response wraps its payload in a `data` field; paginated lists
//! nest a second `data` array next to the pagination block. These types are
//! internal to the adapter and never leave it.

use serde::{Deserialize, Serialize};

use crate::domain::models::Card;

/// Standard `{"data": ...}` response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Payload.
    pub data: T,
}

/// Paginated card listing returned by `GET /cards`.
#[derive(Debug, Clone, Deserialize)]
pub struct CardPage {
    /// Cards on this page.
    #[serde(default)]
    pub data: Vec<Card>,
}

/// Entry of `GET /cards/{id}/children`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildCardRef {
    /// Child card id.
    pub card_id: i64,
}

/// Body of archive requests for workspaces and boards.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveRequest {
    /// Always 1; unarchiving is not exposed.
    pub is_archived: u8,
}

impl ArchiveRequest {
    /// Body archiving the target.
    pub const fn archived() -> Self {
        Self { is_archived: 1 }
    }
}
