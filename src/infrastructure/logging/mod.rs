//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting on stderr (stdout belongs to the tool transport)
//! - Optional daily-rolling JSON log files
//! - Secret scrubbing for text that may echo credentials

pub mod logger;
pub mod secret_scrubbing;

pub use logger::LoggerImpl;
pub use secret_scrubbing::{scrub, SecretScrubber};
