//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

use serde_json::json;

use crate::application::ProxyError;
use crate::domain::errors::InstanceError;

pub use types::{Cli, Commands};

/// Stable kind for a command failure, falling back to `ERROR`.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<ProxyError>() {
        return e.kind();
    }
    if let Some(e) = err.downcast_ref::<InstanceError>() {
        return e.kind().as_str();
    }
    "ERROR"
}

/// Print a command failure to stderr and exit with status 1.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let kind = error_kind(err);
    if json_mode {
        let body = json!({ "error": { "kind": kind, "message": format!("{err:#}") } });
        eprintln!("{body}");
    } else {
        eprintln!("{} [{kind}] {err:#}", console::style("error").red().bold());
    }
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::BulkValidationError;

    #[test]
    fn test_error_kind_downcasts() {
        let err = anyhow::Error::new(ProxyError::from(BulkValidationError::NotAList(
            "string".to_string(),
        )));
        assert_eq!(error_kind(&err), "INVALID_INPUT_TYPE");

        let err = anyhow::Error::new(InstanceError::ConfigNotFound { searched: vec![] });
        assert_eq!(error_kind(&err), "CONFIG_NOT_FOUND");

        assert_eq!(error_kind(&anyhow::anyhow!("boom")), "ERROR");
    }
}
