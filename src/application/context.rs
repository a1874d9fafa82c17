//! Process context shared by tool handlers.
//!
//! One [`ProxyContext`] is built at startup and passed to every handler. It
//! owns the client manager, the read cache, the bulk executor and the
//! dependency precheck; tests build a fresh context instead of resetting
//! shared state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    BulkAction, BulkItemResult, BulkOutcome, BulkSummary, CardUpdate, Config, ResourceType,
};
use crate::domain::ports::{BoardClient, ClientFactory};
use crate::infrastructure::businessmap::{BusinessMapClientConfig, HttpClientFactory};
use crate::infrastructure::config::InstanceLoadOptions;
use crate::services::{
    BulkExecutor, CacheOptions, CacheStats, ClientManager, ClientManagerOptions,
    DependencyPrecheck, DependencyReport, ManagedClient, NamedId, RequestCache,
};

use super::error::ProxyResult;

/// Result of a bulk write, ready to be shaped into a tool response.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    /// Instance the write ran against.
    pub instance: String,
    /// Action performed.
    pub action: BulkAction,
    /// Kind of resource targeted.
    pub resource: ResourceType,
    /// Display name per id, resolved before the write ran.
    pub names: Vec<NamedId>,
    /// Precheck taken before a destructive action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyReport>,
    /// One entry per id, in input order.
    pub results: Vec<BulkItemResult>,
    /// Counts and failures.
    pub summary: BulkSummary,
    /// Overall classification.
    pub outcome: BulkOutcome,
}

impl BulkReport {
    /// Display name recorded for `id`.
    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.names
            .iter()
            .find(|named| named.id == id)
            .map(|named| named.name.as_str())
    }

    /// One-line description naming every failed item.
    pub fn message(&self) -> String {
        let mut line = format!(
            "{} on '{}': {} of {} succeeded",
            self.action, self.instance, self.summary.succeeded, self.summary.total
        );
        if !self.summary.failed.is_empty() {
            let failures = self
                .summary
                .failed
                .iter()
                .map(|failure| {
                    let name = self
                        .name_of(failure.id)
                        .map_or_else(|| self.resource.fallback_name(failure.id), str::to_string);
                    format!("{name} [{}]: {}", failure.id, failure.error)
                })
                .collect::<Vec<_>>()
                .join("; ");
            line.push_str(". Failed: ");
            line.push_str(&failures);
        }
        line
    }
}

/// Dependency precheck for a set of ids on one instance.
#[derive(Debug, Clone, Serialize)]
pub struct PrecheckReport {
    /// Instance the precheck ran against.
    pub instance: String,
    /// Kind of resource checked.
    pub resource: ResourceType,
    /// Ids split by whether they have dependents.
    #[serde(flatten)]
    pub dependencies: DependencyReport,
}

/// Process context owning the services every tool handler shares.
///
/// Cached reads are keyed `{instance}:{resource}:{id}`. They are tied to the
/// credential epoch of the client that fetched them: once an instance's
/// token rotates or its configuration is reloaded, its reads are dropped
/// before the new client serves anything.
pub struct ProxyContext {
    clients: ClientManager,
    reads: RequestCache<Value, DomainError>,
    executor: BulkExecutor,
    precheck: DependencyPrecheck,
    read_epochs: Mutex<HashMap<String, u64>>,
}

impl ProxyContext {
    /// Context talking to the Businessmap HTTP API.
    pub fn new(config: &Config) -> Self {
        let factory = HttpClientFactory::new(BusinessMapClientConfig::from(&config.clients));
        Self::with_factory(config, Arc::new(factory))
    }

    /// Context building its clients with `factory`.
    pub fn with_factory(config: &Config, factory: Arc<dyn ClientFactory>) -> Self {
        let options = ClientManagerOptions::from_config(
            &config.clients,
            InstanceLoadOptions::from(&config.instances),
        );
        Self::from_parts(
            ClientManager::new(options, factory),
            RequestCache::new(CacheOptions::from(&config.cache)),
            BulkExecutor::from(&config.bulk),
            DependencyPrecheck::new(config.bulk.concurrency),
        )
    }

    /// Assemble a context from already-built services.
    pub fn from_parts(
        clients: ClientManager,
        reads: RequestCache<Value, DomainError>,
        executor: BulkExecutor,
        precheck: DependencyPrecheck,
    ) -> Self {
        Self {
            clients,
            reads,
            executor,
            precheck,
            read_epochs: Mutex::new(HashMap::new()),
        }
    }

    /// Client manager shared by every handler.
    pub const fn clients(&self) -> &ClientManager {
        &self.clients
    }

    /// Cache of backend reads, keyed `{instance}:{resource}:{id}`.
    pub const fn reads(&self) -> &RequestCache<Value, DomainError> {
        &self.reads
    }

    /// Executor used for bulk writes.
    pub const fn executor(&self) -> &BulkExecutor {
        &self.executor
    }

    /// Snapshot of the read cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.reads.stats()
    }

    /// Client for `instance`, or the default instance when `None`.
    ///
    /// Drops the instance's cached reads when the client comes from a newer
    /// credential epoch than the one those reads were fetched under.
    pub async fn client(&self, instance: Option<&str>) -> ProxyResult<Arc<ManagedClient>> {
        let managed = self.clients.get_client(instance).await?;
        self.retire_stale_reads(&managed);
        Ok(managed)
    }

    /// Reload instance configuration, dropping every cached client and read.
    pub fn reinitialize(&self) -> ProxyResult<()> {
        self.clients.reinitialize()?;
        let dropped = self.reads.len();
        self.reads.clear();
        self.read_epochs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!(dropped, "Proxy context reinitialized");
        Ok(())
    }

    fn retire_stale_reads(&self, managed: &ManagedClient) {
        let epoch = managed.credential_epoch();
        let previous = self
            .read_epochs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(managed.instance_name().to_string(), epoch);
        if previous.is_none_or(|previous| previous == epoch) {
            return;
        }

        let pattern = format!("^{}:", regex::escape(managed.instance_name()));
        let removed = match Regex::new(&pattern) {
            Ok(regex) => self.reads.invalidate(regex),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid invalidation pattern, clearing read cache");
                self.reads.clear();
                0
            }
        };
        tracing::info!(
            instance = %managed.instance_name(),
            removed,
            "Credential epoch changed, dropped cached reads"
        );
    }

    /// Memoize a read under `key`, namespaced by `instance`.
    pub async fn cached_read<F, Fut>(&self, instance: &str, key: &str, fetcher: F) -> DomainResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainResult<Value>> + Send + 'static,
    {
        self.reads
            .get(&format!("{instance}:{key}"), fetcher, None)
            .await
    }

    /// Workspace by id, served from the read cache when fresh.
    pub async fn get_workspace(&self, instance: Option<&str>, workspace_id: i64) -> ProxyResult<Value> {
        self.read_resource(instance, ResourceType::Workspace, workspace_id)
            .await
    }

    /// Board by id, served from the read cache when fresh.
    pub async fn get_board(&self, instance: Option<&str>, board_id: i64) -> ProxyResult<Value> {
        self.read_resource(instance, ResourceType::Board, board_id)
            .await
    }

    /// Card by id, served from the read cache when fresh.
    pub async fn get_card(&self, instance: Option<&str>, card_id: i64) -> ProxyResult<Value> {
        self.read_resource(instance, ResourceType::Card, card_id)
            .await
    }

    /// Boards of a workspace.
    pub async fn list_boards(&self, instance: Option<&str>, workspace_id: i64) -> ProxyResult<Value> {
        let managed = self.client(instance).await?;
        let client = managed.client();
        let key = format!("workspace:{workspace_id}:boards");
        let value = self
            .cached_read(managed.instance_name(), &key, move || async move {
                Ok::<_, DomainError>(serde_json::to_value(client.list_boards(workspace_id).await?)?)
            })
            .await?;
        Ok(value)
    }

    /// Cards on a board.
    pub async fn list_cards(&self, instance: Option<&str>, board_id: i64) -> ProxyResult<Value> {
        let managed = self.client(instance).await?;
        let client = managed.client();
        let key = format!("board:{board_id}:cards");
        let value = self
            .cached_read(managed.instance_name(), &key, move || async move {
                Ok::<_, DomainError>(serde_json::to_value(client.list_cards(board_id).await?)?)
            })
            .await?;
        Ok(value)
    }

    async fn read_resource(
        &self,
        instance: Option<&str>,
        resource: ResourceType,
        id: i64,
    ) -> ProxyResult<Value> {
        let managed = self.client(instance).await?;
        let client = managed.client();
        let key = format!("{}:{id}", resource.key_segment());
        let value = self
            .cached_read(managed.instance_name(), &key, move || async move {
                let value = match resource {
                    ResourceType::Workspace => serde_json::to_value(client.get_workspace(id).await?)?,
                    ResourceType::Board => serde_json::to_value(client.get_board(id).await?)?,
                    ResourceType::Card => serde_json::to_value(client.get_card(id).await?)?,
                };
                Ok::<_, DomainError>(value)
            })
            .await?;
        Ok(value)
    }

    /// Resolve names and dependents for `ids` without writing anything.
    pub async fn precheck(
        &self,
        instance: Option<&str>,
        resource: ResourceType,
        ids: &Value,
    ) -> ProxyResult<PrecheckReport> {
        let ids = self.executor.parse_ids(ids)?;
        let managed = self.client(instance).await?;
        let dependencies = self
            .precheck
            .analyze(managed.client().as_ref(), resource, &ids)
            .await;
        Ok(PrecheckReport {
            instance: managed.instance_name().to_string(),
            resource,
            dependencies,
        })
    }

    /// Archive every workspace in `ids`, after a dependency precheck.
    pub async fn archive_workspaces(&self, instance: Option<&str>, ids: &Value) -> ProxyResult<BulkReport> {
        self.run_bulk(instance, BulkAction::ArchiveWorkspaces, ids, |client, id| async move {
            client.archive_workspace(id).await
        })
        .await
    }

    /// Archive every board in `ids`, after a dependency precheck.
    pub async fn archive_boards(&self, instance: Option<&str>, ids: &Value) -> ProxyResult<BulkReport> {
        self.run_bulk(instance, BulkAction::ArchiveBoards, ids, |client, id| async move {
            client.archive_board(id).await
        })
        .await
    }

    /// Delete every board in `ids`, after a dependency precheck.
    pub async fn delete_boards(&self, instance: Option<&str>, ids: &Value) -> ProxyResult<BulkReport> {
        self.run_bulk(instance, BulkAction::DeleteBoards, ids, |client, id| async move {
            client.delete_board(id).await
        })
        .await
    }

    /// Delete every card in `ids`, after a dependency precheck.
    pub async fn delete_cards(&self, instance: Option<&str>, ids: &Value) -> ProxyResult<BulkReport> {
        self.run_bulk(instance, BulkAction::DeleteCards, ids, |client, id| async move {
            client.delete_card(id).await
        })
        .await
    }

    /// Apply the same field changes to every card.
    pub async fn update_cards(
        &self,
        instance: Option<&str>,
        ids: &Value,
        update: &CardUpdate,
    ) -> ProxyResult<BulkReport> {
        if update.is_empty() {
            return Err(DomainError::ValidationFailed("card update has no fields set".to_string()).into());
        }
        self.run_bulk(instance, BulkAction::UpdateCards, ids, |client, id| async move {
            client.update_card(id, update).await
        })
        .await
    }

    async fn run_bulk<F, Fut, T>(
        &self,
        instance: Option<&str>,
        action: BulkAction,
        ids: &Value,
        operation: F,
    ) -> ProxyResult<BulkReport>
    where
        F: Fn(Arc<dyn BoardClient>, i64) -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let ids = self.executor.parse_ids(ids)?;
        let managed = self.client(instance).await?;
        let client = managed.client();
        let resource = action.resource();

        if client.is_read_only() {
            return Err(DomainError::ReadOnlyInstance {
                instance: managed.instance_name().to_string(),
                operation: action.label().to_string(),
            }
            .into());
        }

        let (names, dependencies) = if ids.is_empty() {
            (Vec::new(), None)
        } else if action.is_destructive() {
            let report = self.precheck.analyze(client.as_ref(), resource, &ids).await;
            let names = ids
                .iter()
                .map(|&id| NamedId {
                    id,
                    name: report
                        .name_of(id)
                        .map_or_else(|| resource.fallback_name(id), str::to_string),
                })
                .collect();
            (names, Some(report))
        } else {
            let names = self
                .precheck
                .resolve_names(client.as_ref(), resource, &ids)
                .await;
            (names, None)
        };

        let results = self
            .executor
            .execute(&ids, |id| operation(Arc::clone(&client), id))
            .await?;
        let invalidated = self.invalidate_touched(managed.instance_name(), resource, &results);

        let summary = BulkExecutor::summarize(&results);
        let outcome = summary.outcome();
        tracing::info!(
            instance = %managed.instance_name(),
            action = %action,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            invalidated,
            "Bulk operation complete"
        );

        Ok(BulkReport {
            instance: managed.instance_name().to_string(),
            action,
            resource,
            names,
            dependencies,
            results,
            summary,
            outcome,
        })
    }

    /// Drop cached reads of every successfully written id, including lists
    /// keyed under it and the lists that may contain it.
    fn invalidate_touched(
        &self,
        instance: &str,
        resource: ResourceType,
        results: &[BulkItemResult],
    ) -> usize {
        let touched: Vec<String> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.id.to_string())
            .collect();
        if touched.is_empty() {
            return 0;
        }

        let instance = regex::escape(instance);
        let mut patterns = vec![format!(
            "^{instance}:{}:({})(:|$)",
            resource.key_segment(),
            touched.join("|")
        )];
        match resource {
            ResourceType::Workspace => {}
            ResourceType::Board => patterns.push(format!("^{instance}:workspace:\\d+:boards$")),
            ResourceType::Card => patterns.push(format!("^{instance}:board:\\d+:cards$")),
        }

        let mut removed = 0;
        for pattern in patterns {
            match Regex::new(&pattern) {
                Ok(regex) => removed += self.reads.invalidate(regex),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid invalidation pattern, clearing read cache");
                    self.reads.clear();
                }
            }
        }
        removed
    }
}
