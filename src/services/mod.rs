//! Services shared by every tool handler: request cache, client manager,
//! bulk executor and dependency precheck.

pub mod bulk_executor;
pub mod client_manager;
pub mod dependency_precheck;
pub mod request_cache;

pub use bulk_executor::{BulkExecutor, DEFAULT_CONCURRENCY, MAX_BULK_ITEMS};
pub use client_manager::{
    CachedClientInfo, ClientHandle, ClientManager, ClientManagerOptions, ManagedClient,
};
pub use dependency_precheck::{DependencyPrecheck, DependencyReport, DependentSummary, NamedId};
pub use request_cache::{CacheOptions, CacheStats, InvalidationTarget, RequestCache};
