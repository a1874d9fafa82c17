//! Boardgate - multi-instance Businessmap access layer
//!
//! Sits beneath an agent tool proxy and makes repeated reads and bulk writes
//! against one or more Businessmap instances cheap and safe.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, error taxonomy and the backend client port
//! - **Infrastructure Layer** (`infrastructure`): instance configuration,
//!   credentials, the HTTP client and logging
//! - **Service Layer** (`services`): request cache, client lifecycle manager,
//!   bulk executor and dependency precheck
//! - **Application Layer** (`application`): the process context used by tool handlers
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use boardgate::application::ProxyContext;
//! use boardgate::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let context = ProxyContext::new(&config);
//!     let report = context
//!         .archive_workspaces(Some("prod"), &serde_json::json!([12, 15]))
//!         .await?;
//!     println!("{}", report.message());
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{BulkReport, ProxyContext, ProxyError};
pub use domain::errors::{BulkValidationError, DomainError, InstanceError, InstanceErrorKind};
pub use domain::models::{BulkItemResult, Config, ResolutionStrategy, ResourceType};
pub use domain::ports::{BoardClient, ClientFactory};
pub use infrastructure::config::{ConfigError, ConfigLoader, InstanceResolver};
pub use services::{BulkExecutor, ClientManager, DependencyPrecheck, RequestCache};
