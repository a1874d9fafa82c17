//! CLI command implementations.

pub mod bulk;
pub mod instances;
pub mod ping;
pub mod precheck;
