//! Process context tying the services together for tool handlers.

pub mod context;
pub mod error;

pub use context::{BulkReport, PrecheckReport, ProxyContext};
pub use error::{ProxyError, ProxyResult};
