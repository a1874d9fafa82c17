//! Domain layer for the boardgate access layer
//!
//! Core models, error taxonomy and the port traits that backend clients
//! implement. Nothing here performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    BulkValidationError, DomainError, DomainResult, InstanceError, InstanceErrorKind,
    InstanceResult,
};
