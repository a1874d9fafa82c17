//! Businessmap REST API adapter.
//!
//! Implements the [`BoardClient`](crate::domain::ports::BoardClient) port
//! over the Businessmap v2 API, one client per instance and credential.

pub mod budget;
pub mod client;
pub mod models;

pub use budget::RequestBudget;
pub use client::{BusinessMapClient, BusinessMapClientConfig, HttpClientFactory};
