//! Configuration management infrastructure
//!
//! Two layers of configuration:
//! - Process settings (`ConfigLoader`): figment-merged YAML files and
//!   `BOARDGATE_*` environment overrides
//! - Instance descriptors (`InstanceConfigLoader`, `InstanceResolver`):
//!   the multi-tenant backend definitions and per-call resolution

pub mod instances;
pub mod loader;
pub mod resolver;

pub use instances::{InstanceConfigLoader, InstanceLoadOptions, InstanceSource, LoadedInstances};
pub use loader::{ConfigError, ConfigLoader};
pub use resolver::InstanceResolver;
