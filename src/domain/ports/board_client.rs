//! Backend client port.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Board, Card, CardUpdate, CurrentUser, ResolvedInstance, Workspace};

/// Client bound to a single backend instance and credential.
///
/// Implementations must be cheap to share behind an `Arc`; every method takes
/// `&self` and may be called concurrently.
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Name of the instance this client talks to.
    fn instance_name(&self) -> &str;

    /// Read-only clients refuse every write before touching the network.
    fn is_read_only(&self) -> bool;

    /// Verify connectivity and credentials. Called once per new client.
    async fn initialize(&self) -> DomainResult<CurrentUser>;

    /// Workspace by id.
    async fn get_workspace(&self, workspace_id: i64) -> DomainResult<Workspace>;

    /// Board by id.
    async fn get_board(&self, board_id: i64) -> DomainResult<Board>;

    /// Card by id.
    async fn get_card(&self, card_id: i64) -> DomainResult<Card>;

    /// Boards belonging to a workspace.
    async fn list_boards(&self, workspace_id: i64) -> DomainResult<Vec<Board>>;

    /// Cards on a board.
    async fn list_cards(&self, board_id: i64) -> DomainResult<Vec<Card>>;

    /// Ids of the child cards linked under a card.
    async fn list_card_children(&self, card_id: i64) -> DomainResult<Vec<i64>>;

    /// Archive a workspace. Refused on read-only instances.
    async fn archive_workspace(&self, workspace_id: i64) -> DomainResult<()>;

    /// Archive a board. Refused on read-only instances.
    async fn archive_board(&self, board_id: i64) -> DomainResult<()>;

    /// Delete a board. Refused on read-only instances.
    async fn delete_board(&self, board_id: i64) -> DomainResult<()>;

    /// Apply a partial update and return the updated card.
    async fn update_card(&self, card_id: i64, update: &CardUpdate) -> DomainResult<Card>;

    /// Delete a card. Refused on read-only instances.
    async fn delete_card(&self, card_id: i64) -> DomainResult<()>;
}

/// Builds clients for resolved instances.
pub trait ClientFactory: Send + Sync {
    /// Build a client for `instance`.
    fn create(&self, instance: &ResolvedInstance) -> DomainResult<Arc<dyn BoardClient>>;
}
