//! Businessmap resource models.
//!
//! Only the fields the access layer reads are modelled; unknown fields in
//! backend payloads are ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of backend resource a bulk operation or precheck targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A workspace.
    Workspace,
    /// A board inside a workspace.
    Board,
    /// A card on a board.
    Card,
}

impl ResourceType {
    /// Label used in messages and fallback names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Workspace => "Workspace",
            Self::Board => "Board",
            Self::Card => "Card",
        }
    }

    /// Cache-key segment for reads of this resource.
    pub const fn key_segment(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Board => "board",
            Self::Card => "card",
        }
    }

    /// Label of the resources that depend on this one.
    pub const fn dependent_label(self) -> &'static str {
        match self {
            Self::Workspace => "boards",
            Self::Board => "cards",
            Self::Card => "child cards",
        }
    }

    /// Deterministic display name used when the real name cannot be read.
    pub fn fallback_name(self, id: i64) -> String {
        format!("{} {id}", self.label())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().trim_end_matches('s') {
            "workspace" => Ok(Self::Workspace),
            "board" => Ok(Self::Board),
            "card" => Ok(Self::Card),
            other => Err(format!("unknown resource type: {other}")),
        }
    }
}

/// A workspace as returned by `GET /workspaces/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace id.
    pub workspace_id: i64,
    /// Workspace name.
    #[serde(default)]
    pub name: String,
    /// 1 when archived.
    #[serde(default)]
    pub is_archived: u8,
}

/// A board as returned by `GET /boards/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Board id.
    pub board_id: i64,
    /// Owning workspace.
    #[serde(default)]
    pub workspace_id: Option<i64>,
    /// Board name.
    #[serde(default)]
    pub name: String,
    /// 1 when archived.
    #[serde(default)]
    pub is_archived: u8,
}

/// A card as returned by `GET /cards/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Card id.
    pub card_id: i64,
    /// Board the card sits on.
    #[serde(default)]
    pub board_id: Option<i64>,
    /// Card title.
    #[serde(default)]
    pub title: String,
    /// Assigned user.
    #[serde(default)]
    pub owner_user_id: Option<i64>,
}

/// The user an API token belongs to, returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Numeric user id.
    pub user_id: i64,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// Partial card update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Target column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<i64>,
    /// Target lane.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane_id: Option<i64>,
    /// New owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<i64>,
    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

impl CardUpdate {
    /// True when no field would change.
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.column_id.is_none()
            && self.lane_id.is_none()
            && self.owner_user_id.is_none()
            && self.priority.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_update_is_empty() {
        assert!(CardUpdate::default().is_empty());
        let update = CardUpdate {
            column_id: Some(7),
            ..CardUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(ResourceType::Board.fallback_name(42), "Board 42");
        assert_eq!(ResourceType::Workspace.fallback_name(1), "Workspace 1");
    }

    #[test]
    fn test_parse_resource_type() {
        assert_eq!("workspaces".parse::<ResourceType>(), Ok(ResourceType::Workspace));
        assert_eq!("Board".parse::<ResourceType>(), Ok(ResourceType::Board));
        assert_eq!("cards".parse::<ResourceType>(), Ok(ResourceType::Card));
        assert!("lanes".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_card_update_skips_unset_fields() {
        let update = CardUpdate {
            column_id: Some(3),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).expect("serializes");
        assert_eq!(json, serde_json::json!({ "column_id": 3 }));
    }
}
