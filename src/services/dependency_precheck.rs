//! Name resolution and dependent counting ahead of destructive bulk calls.
//!
//! Every id always comes back with a usable name: when the resource cannot
//! be read, or reads back without a name, a fallback of the form
//! `"<ResourceType> <id>"` is used instead.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::ResourceType;
use crate::domain::ports::BoardClient;

use super::bulk_executor::DEFAULT_CONCURRENCY;

/// An id paired with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedId {
    /// Resource id.
    pub id: i64,
    /// Backend name, or a `Resource {id}` fallback when it could not be read.
    pub name: String,
}

/// An id that still has dependent resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentSummary {
    /// Resource id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Boards of a workspace, cards of a board, or children of a card.
    pub dependent_count: usize,
}

/// Ids partitioned by whether they have dependents, each side in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// Ids that still have dependents.
    pub with_dependents: Vec<DependentSummary>,
    /// Ids safe to act on.
    pub without_dependents: Vec<NamedId>,
}

impl DependencyReport {
    /// Whether any id still has dependents.
    pub fn has_dependents(&self) -> bool {
        !self.with_dependents.is_empty()
    }

    /// Sum of dependents across all ids.
    pub fn total_dependents(&self) -> usize {
        self.with_dependents.iter().map(|d| d.dependent_count).sum()
    }

    /// Display name recorded for `id`.
    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.with_dependents
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
            .or_else(|| {
                self.without_dependents
                    .iter()
                    .find(|n| n.id == id)
                    .map(|n| n.name.as_str())
            })
    }
}

/// Counts dependents of resources before a destructive bulk write.
#[derive(Debug, Clone, Copy)]
pub struct DependencyPrecheck {
    concurrency: usize,
}

impl Default for DependencyPrecheck {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl DependencyPrecheck {
    /// Precheck with at most `concurrency` lookups in flight (at least 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve a display name for every id, in input order.
    pub async fn resolve_names(
        &self,
        client: &dyn BoardClient,
        resource: ResourceType,
        ids: &[i64],
    ) -> Vec<NamedId> {
        stream::iter(ids.iter().copied())
            .map(|id| async move {
                NamedId {
                    id,
                    name: resolve_name(client, resource, id).await,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Resolve names and count dependents for every id.
    ///
    /// Workspaces are checked for boards, boards for cards and cards for
    /// child cards. A failed dependent lookup counts as no dependents.
    pub async fn analyze(
        &self,
        client: &dyn BoardClient,
        resource: ResourceType,
        ids: &[i64],
    ) -> DependencyReport {
        let checked: Vec<(i64, String, usize)> = stream::iter(ids.iter().copied())
            .map(|id| async move {
                let (name, count) = futures::join!(
                    resolve_name(client, resource, id),
                    count_dependents(client, resource, id)
                );
                let count = count.unwrap_or_else(|e| {
                    tracing::warn!(
                        instance = client.instance_name(),
                        resource = %resource,
                        id,
                        error = %e,
                        "Dependent lookup failed, assuming none"
                    );
                    0
                });
                (id, name, count)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = DependencyReport::default();
        for (id, name, dependent_count) in checked {
            if dependent_count > 0 {
                report.with_dependents.push(DependentSummary {
                    id,
                    name,
                    dependent_count,
                });
            } else {
                report.without_dependents.push(NamedId { id, name });
            }
        }

        tracing::debug!(
            resource = %resource,
            with_dependents = report.with_dependents.len(),
            without_dependents = report.without_dependents.len(),
            "Dependency precheck complete"
        );
        report
    }

    /// Names keyed by id, for callers that need lookups rather than order.
    pub async fn name_map(
        &self,
        client: &dyn BoardClient,
        resource: ResourceType,
        ids: &[i64],
    ) -> HashMap<i64, String> {
        self.resolve_names(client, resource, ids)
            .await
            .into_iter()
            .map(|named| (named.id, named.name))
            .collect()
    }
}

async fn resolve_name(client: &dyn BoardClient, resource: ResourceType, id: i64) -> String {
    let lookup = match resource {
        ResourceType::Workspace => client.get_workspace(id).await.map(|w| w.name),
        ResourceType::Board => client.get_board(id).await.map(|b| b.name),
        ResourceType::Card => client.get_card(id).await.map(|c| c.title),
    };

    match lookup {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => resource.fallback_name(id),
        Err(e) => {
            tracing::debug!(resource = %resource, id, error = %e, "Name lookup failed, using fallback");
            resource.fallback_name(id)
        }
    }
}

async fn count_dependents(
    client: &dyn BoardClient,
    resource: ResourceType,
    id: i64,
) -> DomainResult<usize> {
    match resource {
        ResourceType::Workspace => Ok(client
            .list_boards(id)
            .await?
            .iter()
            .filter(|board| board.is_archived == 0)
            .count()),
        ResourceType::Board => Ok(client.list_cards(id).await?.len()),
        ResourceType::Card => Ok(client.list_card_children(id).await?.len()),
    }
}
