//! Domain models.

pub mod bulk;
pub mod config;
pub mod instance;
pub mod resource;

pub use bulk::{BulkAction, BulkFailure, BulkItemResult, BulkOutcome, BulkSummary};
pub use config::{
    BulkConfig, CacheConfig, ClientsConfig, Config, InstanceSourceConfig, LogFormat, LoggingConfig,
};
pub use instance::{
    InstanceDescriptor, InstanceSummary, InstancesConfig, ResolutionStrategy, ResolvedInstance,
};
pub use resource::{Board, Card, CardUpdate, CurrentUser, ResourceType, Workspace};
