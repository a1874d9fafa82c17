//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async interfaces infrastructure adapters implement:
//! - BoardClient: reads and writes against one backend instance
//! - ClientFactory: builds a BoardClient for a resolved instance
//!
//! The services layer only ever talks to these traits, so tests can swap
//! in in-memory clients.

pub mod board_client;

pub use board_client::{BoardClient, ClientFactory};
