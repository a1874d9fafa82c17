//! Instance configuration domain models.
//!
//! An instance is one configured Businessmap tenant addressable by name.
//! Descriptors are immutable once validated; the API token is never part of
//! a descriptor and is only read from the environment at resolution time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level multi-instance configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesConfig {
    /// Schema version, `MAJOR.MINOR`.
    pub version: Option<String>,

    /// Name of the instance used when a call does not name one.
    #[serde(default)]
    pub default_instance: Option<String>,

    /// Configured instances. Names are unique.
    #[serde(default)]
    pub instances: Vec<InstanceDescriptor>,
}

impl InstancesConfig {
    /// Descriptor named `name`.
    pub fn find(&self, name: &str) -> Option<&InstanceDescriptor> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Instance names in configuration order.
    pub fn names(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.name.clone()).collect()
    }
}

/// One backend tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    /// Unique name callers select the instance by.
    pub name: String,

    /// Base URL of the API, e.g. `https://acme.kanbanize.com/api/v2`.
    pub api_url: String,

    /// Name of the environment variable holding the API token.
    #[serde(alias = "apiTokenEnvVar")]
    pub api_token_env: String,

    /// Refuse every write locally.
    #[serde(default)]
    pub read_only_mode: bool,

    /// Workspace used when a call does not name one.
    #[serde(default)]
    pub default_workspace_id: Option<i64>,

    /// Free-form note shown in listings.
    #[serde(default)]
    pub description: Option<String>,
}

/// How the active instance of a call was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// The caller named the instance.
    Explicit,
    /// The configured default instance was used.
    Default,
    /// Single instance synthesized from the legacy URL/token variables.
    Legacy,
}

impl ResolutionStrategy {
    /// Lower-case name used in output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Default => "default",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An instance together with the credential read for this resolution.
#[derive(Clone)]
pub struct ResolvedInstance {
    /// The instance's configuration.
    pub descriptor: InstanceDescriptor,
    /// Token read from the descriptor's variable. Never logged.
    pub api_token: String,
    /// How the instance was chosen.
    pub strategy: ResolutionStrategy,
}

impl ResolvedInstance {
    /// Instance name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Non-secret view of this resolution.
    pub fn summary(&self) -> InstanceSummary {
        InstanceSummary::new(&self.descriptor, Some(self.strategy))
    }
}

impl fmt::Debug for ResolvedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedInstance")
            .field("descriptor", &self.descriptor)
            .field("api_token", &"[REDACTED]")
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Non-secret view of an instance for introspection and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    /// Instance name.
    pub name: String,
    /// Base API URL.
    pub api_url: String,
    /// Whether writes are refused.
    pub read_only_mode: bool,
    /// Workspace used when a call does not name one.
    pub default_workspace_id: Option<i64>,
    /// Free-form note.
    pub description: Option<String>,
    /// Set when the summary describes a resolution rather than a descriptor.
    pub strategy: Option<ResolutionStrategy>,
}

impl InstanceSummary {
    /// Summary of `descriptor`.
    pub fn new(descriptor: &InstanceDescriptor, strategy: Option<ResolutionStrategy>) -> Self {
        Self {
            name: descriptor.name.clone(),
            api_url: descriptor.api_url.clone(),
            read_only_mode: descriptor.read_only_mode,
            default_workspace_id: descriptor.default_workspace_id,
            description: descriptor.description.clone(),
            strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_document() {
        let json = r#"{
            "version": "1.0",
            "defaultInstance": "prod",
            "instances": [
                {
                    "name": "prod",
                    "apiUrl": "https://acme.kanbanize.com/api/v2",
                    "apiTokenEnv": "BM_PROD_TOKEN",
                    "readOnlyMode": true,
                    "defaultWorkspaceId": 7
                },
                {
                    "name": "dev",
                    "apiUrl": "https://dev.kanbanize.com/api/v2",
                    "apiTokenEnvVar": "BM_DEV_TOKEN"
                }
            ]
        }"#;

        let config: InstancesConfig = serde_json::from_str(json).expect("document should parse");
        assert_eq!(config.default_instance.as_deref(), Some("prod"));
        assert_eq!(config.names(), vec!["prod", "dev"]);

        let prod = config.find("prod").expect("prod exists");
        assert!(prod.read_only_mode);
        assert_eq!(prod.default_workspace_id, Some(7));

        let dev = config.find("dev").expect("dev exists");
        assert_eq!(dev.api_token_env, "BM_DEV_TOKEN");
        assert!(!dev.read_only_mode);
    }

    #[test]
    fn test_resolved_instance_debug_redacts_token() {
        let resolved = ResolvedInstance {
            descriptor: InstanceDescriptor {
                name: "prod".to_string(),
                api_url: "https://acme.kanbanize.com/api/v2".to_string(),
                api_token_env: "BM_PROD_TOKEN".to_string(),
                read_only_mode: false,
                default_workspace_id: None,
                description: None,
            },
            api_token: "super-secret-token".to_string(),
            strategy: ResolutionStrategy::Explicit,
        };

        let debug = format!("{resolved:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
