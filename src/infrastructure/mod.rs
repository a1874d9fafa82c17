//! Infrastructure layer module
//!
//! This module contains the adapters and external integrations:
//! - Businessmap HTTP client (reqwest)
//! - Configuration management (figment)
//! - Instance resolution and credential fingerprinting
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod businessmap;
pub mod config;
pub mod credentials;
pub mod logging;
