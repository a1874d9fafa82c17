//! Common test utilities for integration tests
//!
//! Provides an in-memory [`BoardClient`] with scripted behaviour, a factory
//! that records every client it builds, and instance configuration helpers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use boardgate::domain::errors::{DomainError, DomainResult};
use boardgate::domain::models::{
    Board, Card, CardUpdate, CurrentUser, InstanceDescriptor, InstancesConfig, ResolvedInstance,
    Workspace,
};
use boardgate::domain::ports::{BoardClient, ClientFactory};
use boardgate::infrastructure::config::{InstanceResolver, InstanceSource};

/// Scripted behaviour shared by every client a [`MockFactory`] builds.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Display names, used for workspaces, boards and cards alike.
    pub names: HashMap<i64, String>,
    /// Ids whose reads fail with `NotFound`.
    pub missing: HashSet<i64>,
    /// Ids whose writes fail.
    pub failing_writes: HashSet<i64>,
    /// Ids whose writes panic.
    pub panicking_writes: HashSet<i64>,
    /// Dependent count per id.
    pub dependents: HashMap<i64, usize>,
    /// Ids whose dependent lookup fails.
    pub failing_dependents: HashSet<i64>,
    /// How long each write takes.
    pub write_delay: Duration,
    pub fail_initialize: bool,
}

impl MockBehavior {
    pub fn named(mut self, id: i64, name: &str) -> Self {
        self.names.insert(id, name.to_string());
        self
    }

    pub fn missing(mut self, id: i64) -> Self {
        self.missing.insert(id);
        self
    }

    pub fn failing_write(mut self, id: i64) -> Self {
        self.failing_writes.insert(id);
        self
    }

    pub fn panicking_write(mut self, id: i64) -> Self {
        self.panicking_writes.insert(id);
        self
    }

    pub fn with_dependents(mut self, id: i64, count: usize) -> Self {
        self.dependents.insert(id, count);
        self
    }

    pub fn failing_dependents(mut self, id: i64) -> Self {
        self.failing_dependents.insert(id);
        self
    }

    pub const fn write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub const fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }
}

pub struct MockBoardClient {
    instance: String,
    token: String,
    read_only: bool,
    behavior: MockBehavior,
    pub init_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    written: Mutex<Vec<i64>>,
}

impl MockBoardClient {
    pub fn new(instance: &str, behavior: MockBehavior) -> Self {
        Self {
            instance: instance.to_string(),
            token: String::new(),
            read_only: false,
            behavior,
            init_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
        }
    }

    /// Token the client was built with.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Ids that were written successfully, in completion order.
    pub fn written(&self) -> Vec<i64> {
        self.written.lock().unwrap().clone()
    }

    fn name(&self, id: i64) -> String {
        self.behavior.names.get(&id).cloned().unwrap_or_default()
    }

    fn read(&self, resource: &str, id: i64) -> DomainResult<()> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior.missing.contains(&id) {
            return Err(DomainError::NotFound {
                resource: resource.to_string(),
                id,
            });
        }
        Ok(())
    }

    fn dependents(&self, id: i64) -> DomainResult<usize> {
        if self.behavior.failing_dependents.contains(&id) {
            return Err(DomainError::ApiRequestFailed {
                status: Some(503),
                message: "dependents unavailable".to_string(),
            });
        }
        Ok(self.behavior.dependents.get(&id).copied().unwrap_or(0))
    }

    async fn write(&self, operation: &str, id: i64) -> DomainResult<()> {
        if self.read_only {
            return Err(DomainError::ReadOnlyInstance {
                instance: self.instance.clone(),
                operation: operation.to_string(),
            });
        }
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.behavior.write_delay.is_zero() {
            tokio::time::sleep(self.behavior.write_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.behavior.panicking_writes.contains(&id) {
            panic!("simulated panic while writing {id}");
        }
        if self.behavior.failing_writes.contains(&id) {
            return Err(DomainError::ApiRequestFailed {
                status: Some(500),
                message: format!("simulated failure for {id}"),
            });
        }
        self.written.lock().unwrap().push(id);
        Ok(())
    }
}

#[async_trait]
impl BoardClient for MockBoardClient {
    fn instance_name(&self) -> &str {
        &self.instance
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn initialize(&self) -> DomainResult<CurrentUser> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.behavior.fail_initialize {
            return Err(DomainError::Unauthorized(self.instance.clone()));
        }
        Ok(CurrentUser {
            user_id: 1,
            username: Some("agent".to_string()),
            email: None,
        })
    }

    async fn get_workspace(&self, workspace_id: i64) -> DomainResult<Workspace> {
        self.read("Workspace", workspace_id)?;
        Ok(Workspace {
            workspace_id,
            name: self.name(workspace_id),
            is_archived: 0,
        })
    }

    async fn get_board(&self, board_id: i64) -> DomainResult<Board> {
        self.read("Board", board_id)?;
        Ok(Board {
            board_id,
            workspace_id: None,
            name: self.name(board_id),
            is_archived: 0,
        })
    }

    async fn get_card(&self, card_id: i64) -> DomainResult<Card> {
        self.read("Card", card_id)?;
        Ok(Card {
            card_id,
            board_id: None,
            title: self.name(card_id),
            owner_user_id: None,
        })
    }

    async fn list_boards(&self, workspace_id: i64) -> DomainResult<Vec<Board>> {
        let count = self.dependents(workspace_id)?;
        Ok((0..count)
            .map(|i| Board {
                board_id: workspace_id * 100 + i as i64,
                workspace_id: Some(workspace_id),
                name: format!("board {i}"),
                is_archived: 0,
            })
            .collect())
    }

    async fn list_cards(&self, board_id: i64) -> DomainResult<Vec<Card>> {
        let count = self.dependents(board_id)?;
        Ok((0..count)
            .map(|i| Card {
                card_id: board_id * 100 + i as i64,
                board_id: Some(board_id),
                title: format!("card {i}"),
                owner_user_id: None,
            })
            .collect())
    }

    async fn list_card_children(&self, card_id: i64) -> DomainResult<Vec<i64>> {
        let count = self.dependents(card_id)?;
        Ok((0..count).map(|i| card_id * 100 + i as i64).collect())
    }

    async fn archive_workspace(&self, workspace_id: i64) -> DomainResult<()> {
        self.write("archive workspace", workspace_id).await
    }

    async fn archive_board(&self, board_id: i64) -> DomainResult<()> {
        self.write("archive board", board_id).await
    }

    async fn delete_board(&self, board_id: i64) -> DomainResult<()> {
        self.write("delete board", board_id).await
    }

    async fn update_card(&self, card_id: i64, update: &CardUpdate) -> DomainResult<Card> {
        self.write("update card", card_id).await?;
        Ok(Card {
            card_id,
            board_id: None,
            title: update.title.clone().unwrap_or_else(|| self.name(card_id)),
            owner_user_id: update.owner_user_id,
        })
    }

    async fn delete_card(&self, card_id: i64) -> DomainResult<()> {
        self.write("delete card", card_id).await
    }
}

/// Factory building [`MockBoardClient`]s and remembering each one.
#[derive(Default)]
pub struct MockFactory {
    behavior: MockBehavior,
    fail_create: bool,
    created: Mutex<Vec<Arc<MockBoardClient>>>,
}

impl MockFactory {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<Arc<MockBoardClient>> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<MockBoardClient> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no client created yet")
    }
}

impl ClientFactory for MockFactory {
    fn create(&self, instance: &ResolvedInstance) -> DomainResult<Arc<dyn BoardClient>> {
        if self.fail_create {
            return Err(DomainError::ApiRequestFailed {
                status: None,
                message: "factory refused".to_string(),
            });
        }
        let mut client = MockBoardClient::new(instance.name(), self.behavior.clone());
        client.token = instance.api_token.clone();
        client.read_only = instance.descriptor.read_only_mode;
        let client = Arc::new(client);
        self.created.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}

pub fn descriptor(name: &str, token_env: &str) -> InstanceDescriptor {
    InstanceDescriptor {
        name: name.to_string(),
        api_url: format!("https://{name}.example.com/api/v2"),
        api_token_env: token_env.to_string(),
        read_only_mode: false,
        default_workspace_id: None,
        description: None,
    }
}

pub fn instances_config(instances: Vec<InstanceDescriptor>) -> InstancesConfig {
    InstancesConfig {
        version: Some("1.0".to_string()),
        default_instance: instances.first().map(|i| i.name.clone()),
        instances,
    }
}

/// Resolver over `instances`, as if loaded from an environment blob.
pub fn resolver(instances: Vec<InstanceDescriptor>) -> InstanceResolver {
    InstanceResolver::from_config(
        instances_config(instances),
        InstanceSource::Env("TEST_INSTANCES".to_string()),
    )
    .expect("test configuration should validate")
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
