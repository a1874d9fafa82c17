//! Per-instance client lifecycle management.
//!
//! Hands out one backend client per (instance, credential). The credential
//! itself is never retained: slots remember a [`Fingerprint`] and compare it
//! on every lookup, so a rotated token retires the old client and a fresh one
//! is built. Construction is single-flight: concurrent lookups for the same
//! instance and credential share one build, decided under the slot lock.
//!
//! Independently of client caching, every instance carries a credential
//! epoch that changes whenever its token fingerprint changes or the
//! configuration is reloaded. Callers holding data fetched through an older
//! epoch must treat it as stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;

use crate::domain::errors::{InstanceError, InstanceResult};
use crate::domain::models::{ClientsConfig, InstanceSummary, ResolutionStrategy, ResolvedInstance};
use crate::domain::ports::{BoardClient, ClientFactory};
use crate::infrastructure::config::{InstanceLoadOptions, InstanceResolver};
use crate::infrastructure::credentials::Fingerprint;

type SharedBuild = Shared<BoxFuture<'static, InstanceResult<Arc<ManagedClient>>>>;

/// Lifecycle switches.
#[derive(Debug, Clone)]
pub struct ClientManagerOptions {
    /// Reuse clients per (instance, credential); otherwise build on every call.
    pub enable_caching: bool,
    /// Run `initialize` on new clients before returning them.
    pub initialize_clients: bool,
    /// Propagate initialization failures; otherwise log them and return the
    /// uninitialized client.
    pub fail_on_init_error: bool,
    /// Where instance descriptors are loaded from.
    pub load: InstanceLoadOptions,
}

impl Default for ClientManagerOptions {
    fn default() -> Self {
        Self {
            enable_caching: true,
            initialize_clients: true,
            fail_on_init_error: true,
            load: InstanceLoadOptions::default(),
        }
    }
}

impl ClientManagerOptions {
    /// Options from the `clients` settings section, loading instances with `load`.
    pub fn from_config(clients: &ClientsConfig, load: InstanceLoadOptions) -> Self {
        Self {
            enable_caching: clients.enable_caching,
            initialize_clients: clients.initialize_on_create,
            fail_on_init_error: clients.fail_on_init_error,
            load,
        }
    }
}

/// Identity of a constructed client. Two lookups returned the same client
/// exactly when their handles are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClientHandle(u64);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// A client together with its lifecycle metadata.
pub struct ManagedClient {
    handle: ClientHandle,
    credential_epoch: u64,
    instance: InstanceSummary,
    created_at: DateTime<Utc>,
    initialized: bool,
    client: Arc<dyn BoardClient>,
}

impl ManagedClient {
    /// Identity of this client.
    pub const fn handle(&self) -> ClientHandle {
        self.handle
    }

    /// Name of the instance the client was built for.
    pub fn instance_name(&self) -> &str {
        &self.instance.name
    }

    /// Epoch of the credential this client was built from. Equal epochs
    /// for one instance mean the same token.
    pub const fn credential_epoch(&self) -> u64 {
        self.credential_epoch
    }

    /// Non-secret description of the instance this client talks to.
    pub const fn instance(&self) -> &InstanceSummary {
        &self.instance
    }

    /// When the client was built.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether `initialize` ran successfully against the backend.
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Shared handle to the underlying client.
    pub fn client(&self) -> Arc<dyn BoardClient> {
        Arc::clone(&self.client)
    }
}

impl std::ops::Deref for ManagedClient {
    type Target = dyn BoardClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl fmt::Debug for ManagedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedClient")
            .field("handle", &self.handle)
            .field("credential_epoch", &self.credential_epoch)
            .field("instance", &self.instance.name)
            .field("created_at", &self.created_at)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

/// Introspection row for a cached client. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedClientInfo {
    /// Instance the client belongs to.
    pub instance_name: String,
    /// False while the client is still being built.
    pub ready: bool,
    /// `None` while the client is still being built.
    pub handle: Option<ClientHandle>,
    /// When the client was built, once ready.
    pub created_at: Option<DateTime<Utc>>,
    /// Whether backend initialization succeeded, once ready.
    pub initialized: Option<bool>,
}

struct ClientSlot {
    build_id: u64,
    fingerprint: Fingerprint,
    build: SharedBuild,
}

type Slots = Arc<Mutex<HashMap<String, ClientSlot>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Last credential seen per instance and the epoch it was given.
struct CredentialEpochs {
    seen: HashMap<String, (Fingerprint, u64)>,
    next: u64,
}

impl CredentialEpochs {
    fn new() -> Self {
        Self {
            seen: HashMap::new(),
            next: 1,
        }
    }

    /// Epoch for `fingerprint` on `instance`, starting a new one when the
    /// credential differs from the last one seen.
    fn observe(&mut self, instance: &str, fingerprint: &Fingerprint) -> u64 {
        if let Some((seen, epoch)) = self.seen.get(instance) {
            if seen == fingerprint {
                return *epoch;
            }
        }
        let epoch = self.next;
        self.next += 1;
        self.seen
            .insert(instance.to_string(), (fingerprint.clone(), epoch));
        epoch
    }
}

/// Resolves instances and manages their clients.
pub struct ClientManager {
    options: ClientManagerOptions,
    factory: Arc<dyn ClientFactory>,
    resolver: RwLock<Option<Arc<InstanceResolver>>>,
    slots: Slots,
    epochs: Mutex<CredentialEpochs>,
    next_id: Arc<AtomicU64>,
}

impl ClientManager {
    /// Create a manager that loads its configuration on first use.
    pub fn new(options: ClientManagerOptions, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            options,
            factory,
            resolver: RwLock::new(None),
            slots: Arc::new(Mutex::new(HashMap::new())),
            epochs: Mutex::new(CredentialEpochs::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a manager around an already loaded resolver.
    pub fn with_resolver(
        resolver: InstanceResolver,
        options: ClientManagerOptions,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let manager = Self::new(options, factory);
        *manager
            .resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(resolver));
        manager
    }

    /// Load instance configuration. Later calls are no-ops.
    pub fn initialize(&self) -> InstanceResult<Arc<InstanceResolver>> {
        if let Some(resolver) = self
            .resolver
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(resolver));
        }

        let mut guard = self.resolver.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(resolver) = guard.as_ref() {
            return Ok(Arc::clone(resolver));
        }

        let resolver = Arc::new(InstanceResolver::load(&self.options.load)?);
        tracing::info!(
            configured = resolver.is_configured(),
            instances = resolver.instances().len(),
            "Client manager initialized"
        );
        *guard = Some(Arc::clone(&resolver));
        Ok(resolver)
    }

    /// Reload instance configuration and drop every cached client. Every
    /// instance starts a new credential epoch.
    pub fn reinitialize(&self) -> InstanceResult<()> {
        let resolver = Arc::new(InstanceResolver::load(&self.options.load)?);
        *self.resolver.write().unwrap_or_else(PoisonError::into_inner) = Some(resolver);
        lock(&self.epochs).seen.clear();
        self.clear();
        tracing::info!("Client manager reinitialized");
        Ok(())
    }

    /// Whether instance configuration was found. Load errors count as not configured.
    pub fn is_configured(&self) -> bool {
        self.initialize().is_ok_and(|r| r.is_configured())
    }

    /// Client for `instance_name`, or for the default instance when `None`.
    pub async fn get_client(&self, instance_name: Option<&str>) -> InstanceResult<Arc<ManagedClient>> {
        let resolver = self.initialize()?;
        let resolved = resolver.get_active_instance(instance_name)?;
        let name = resolved.name().to_string();
        let fingerprint = Fingerprint::of(&resolved.api_token);
        let epoch = lock(&self.epochs).observe(&name, &fingerprint);

        if !self.options.enable_caching {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            return build_client(
                Arc::clone(&self.factory),
                resolved,
                ClientHandle(id),
                epoch,
                self.options.initialize_clients,
                self.options.fail_on_init_error,
            )
            .await;
        }

        let build = {
            let mut slots = lock(&self.slots);
            let reusable = slots
                .get(&name)
                .filter(|slot| slot.fingerprint == fingerprint)
                .map(|slot| slot.build.clone());

            if let Some(build) = reusable {
                tracing::trace!(instance = %name, "reusing cached client");
                build
            } else {
                if slots.contains_key(&name) {
                    tracing::info!(instance = %name, "Credential changed, retiring cached client");
                }
                let build_id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let build = build_and_register(
                    Arc::clone(&self.factory),
                    Arc::clone(&self.slots),
                    resolved,
                    build_id,
                    epoch,
                    self.options.initialize_clients,
                    self.options.fail_on_init_error,
                )
                .boxed()
                .shared();
                slots.insert(
                    name.clone(),
                    ClientSlot {
                        build_id,
                        fingerprint,
                        build: build.clone(),
                    },
                );
                build
            }
        };

        build.await
    }

    /// Non-secret configuration of the instance `instance_name` resolves to.
    pub fn instance_info(&self, instance_name: Option<&str>) -> InstanceResult<InstanceSummary> {
        self.initialize()?.instance_summary(instance_name)
    }

    /// How `instance_name` would be resolved.
    pub fn resolution_strategy(
        &self,
        instance_name: Option<&str>,
    ) -> InstanceResult<ResolutionStrategy> {
        let resolver = self.initialize()?;
        let (_, strategy) = resolver.descriptor(instance_name)?;
        Ok(strategy)
    }

    /// Every configured instance.
    pub fn list_instances(&self) -> InstanceResult<Vec<InstanceSummary>> {
        Ok(self.initialize()?.list_instances())
    }

    /// Name of the configured default instance, if any.
    pub fn default_instance_name(&self) -> InstanceResult<Option<String>> {
        Ok(self.initialize()?.default_instance_name().map(str::to_string))
    }

    /// Cached clients, sorted by instance name.
    pub fn cached_clients(&self) -> Vec<CachedClientInfo> {
        let slots = lock(&self.slots);
        let mut infos: Vec<CachedClientInfo> = slots
            .iter()
            .map(|(name, slot)| match slot.build.peek() {
                Some(Ok(client)) => CachedClientInfo {
                    instance_name: name.clone(),
                    ready: true,
                    handle: Some(client.handle),
                    created_at: Some(client.created_at),
                    initialized: Some(client.initialized),
                },
                _ => CachedClientInfo {
                    instance_name: name.clone(),
                    ready: false,
                    handle: None,
                    created_at: None,
                    initialized: None,
                },
            })
            .collect();
        infos.sort_by(|a, b| a.instance_name.cmp(&b.instance_name));
        infos
    }

    /// Whether a built client is cached for `instance_name`.
    pub fn is_cached(&self, instance_name: &str) -> bool {
        lock(&self.slots)
            .get(instance_name)
            .is_some_and(|slot| matches!(slot.build.peek(), Some(Ok(_))))
    }

    /// When the cached client for `instance_name` was created.
    pub fn created_at(&self, instance_name: &str) -> Option<DateTime<Utc>> {
        lock(&self.slots)
            .get(instance_name)
            .and_then(|slot| match slot.build.peek() {
                Some(Ok(client)) => Some(client.created_at),
                _ => None,
            })
    }

    /// Drop the cached client for `instance_name`. Returns whether one existed.
    pub fn evict(&self, instance_name: &str) -> bool {
        let removed = lock(&self.slots).remove(instance_name).is_some();
        if removed {
            tracing::debug!(instance = %instance_name, "Evicted cached client");
        }
        removed
    }

    /// Drop every cached client.
    pub fn clear(&self) {
        let mut slots = lock(&self.slots);
        let count = slots.len();
        slots.clear();
        tracing::debug!(count, "Cleared client cache");
    }
}

/// Build a client for a slot, removing the slot again if the build fails so
/// the next lookup retries.
async fn build_and_register(
    factory: Arc<dyn ClientFactory>,
    slots: Slots,
    resolved: ResolvedInstance,
    build_id: u64,
    epoch: u64,
    initialize: bool,
    fail_on_init_error: bool,
) -> InstanceResult<Arc<ManagedClient>> {
    let name = resolved.name().to_string();
    let result = build_client(
        factory,
        resolved,
        ClientHandle(build_id),
        epoch,
        initialize,
        fail_on_init_error,
    )
    .await;

    if result.is_err() {
        let mut slots = lock(&slots);
        if slots.get(&name).is_some_and(|slot| slot.build_id == build_id) {
            slots.remove(&name);
        }
    }
    result
}

async fn build_client(
    factory: Arc<dyn ClientFactory>,
    resolved: ResolvedInstance,
    handle: ClientHandle,
    credential_epoch: u64,
    initialize: bool,
    fail_on_init_error: bool,
) -> InstanceResult<Arc<ManagedClient>> {
    let name = resolved.name().to_string();
    let client = factory
        .create(&resolved)
        .map_err(|e| InstanceError::ClientInitFailed {
            instance: name.clone(),
            reason: e.to_string(),
        })?;

    let mut initialized = false;
    if initialize {
        match client.initialize().await {
            Ok(_) => initialized = true,
            Err(e) if fail_on_init_error => {
                tracing::error!(instance = %name, error = %e, "Client initialization failed");
                return Err(InstanceError::ClientInitFailed {
                    instance: name,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    instance = %name,
                    error = %e,
                    "Client initialization failed, returning uninitialized client"
                );
            }
        }
    }

    tracing::debug!(instance = %name, %handle, initialized, "Created client");
    Ok(Arc::new(ManagedClient {
        handle,
        credential_epoch,
        instance: resolved.summary(),
        created_at: Utc::now(),
        initialized,
        client,
    }))
}
