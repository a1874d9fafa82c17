//! Multi-instance descriptor loading and validation.
//!
//! Sources are tried in priority order and the first one present wins:
//! 1. An explicit file (option, or the `BUSINESSMAP_CONFIG_FILE` variable)
//! 2. A JSON document in the `BUSINESSMAP_INSTANCES` variable
//! 3. The default file locations, in order
//! 4. A legacy single instance synthesized from `BUSINESSMAP_API_URL` /
//!    `BUSINESSMAP_API_TOKEN` (only when legacy mode is allowed)
//!
//! Files ending in `.yaml`/`.yml` are read as YAML, everything else as JSON.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::providers::{Format, Json, Yaml};
use figment::Figment;
use regex::Regex;
use url::Url;

use crate::domain::errors::{InstanceError, InstanceResult};
use crate::domain::models::{InstanceDescriptor, InstanceSourceConfig, InstancesConfig};

/// Variable naming the instance configuration file.
pub const CONFIG_FILE_ENV: &str = "BUSINESSMAP_CONFIG_FILE";
/// Variable holding the instance configuration as inline JSON.
pub const INSTANCES_JSON_ENV: &str = "BUSINESSMAP_INSTANCES";
/// Legacy single-instance API URL.
pub const LEGACY_URL_ENV: &str = "BUSINESSMAP_API_URL";
/// Legacy single-instance API token.
pub const LEGACY_TOKEN_ENV: &str = "BUSINESSMAP_API_TOKEN";
/// Legacy read-only flag (`true`/`1`).
pub const LEGACY_READ_ONLY_ENV: &str = "BUSINESSMAP_READ_ONLY_MODE";
/// Legacy default workspace id.
pub const LEGACY_WORKSPACE_ENV: &str = "BUSINESSMAP_DEFAULT_WORKSPACE_ID";

/// Name given to the instance synthesized in legacy mode.
pub const LEGACY_INSTANCE_NAME: &str = "default";

/// Major schema version this loader understands.
const SUPPORTED_MAJOR_VERSION: u32 = 1;

/// Options controlling where descriptors are looked up.
#[derive(Debug, Clone)]
pub struct InstanceLoadOptions {
    /// Explicit configuration file. Takes precedence over every other source.
    pub config_path: Option<PathBuf>,
    /// Fail with `ConfigNotFound` instead of loading as unconfigured.
    pub strict: bool,
    /// Fall back to the legacy URL/token variables.
    pub allow_legacy: bool,
    /// Files tried, in order, when no explicit source is set.
    pub default_paths: Vec<PathBuf>,
    /// Overrides [`CONFIG_FILE_ENV`].
    pub config_file_env: String,
    /// Overrides [`INSTANCES_JSON_ENV`].
    pub instances_env: String,
    /// Overrides [`LEGACY_URL_ENV`].
    pub legacy_url_env: String,
    /// Overrides [`LEGACY_TOKEN_ENV`].
    pub legacy_token_env: String,
}

impl Default for InstanceLoadOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            strict: false,
            allow_legacy: true,
            default_paths: default_config_paths(),
            config_file_env: CONFIG_FILE_ENV.to_string(),
            instances_env: INSTANCES_JSON_ENV.to_string(),
            legacy_url_env: LEGACY_URL_ENV.to_string(),
            legacy_token_env: LEGACY_TOKEN_ENV.to_string(),
        }
    }
}

impl From<&InstanceSourceConfig> for InstanceLoadOptions {
    fn from(config: &InstanceSourceConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            strict: config.strict,
            allow_legacy: config.allow_legacy,
            ..Self::default()
        }
    }
}

/// Default descriptor file locations, most specific first.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".businessmap-instances.json")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("businessmap").join("instances.json"));
    }
    paths.push(PathBuf::from("/etc/businessmap/instances.json"));
    paths
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSource {
    /// Loaded from this file.
    File(PathBuf),
    /// Loaded from this environment variable.
    Env(String),
    /// Synthesized from the legacy variables.
    Legacy,
}

impl fmt::Display for InstanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Env(var) => write!(f, "${var}"),
            Self::Legacy => f.write_str("legacy environment"),
        }
    }
}

/// Result of a load attempt.
#[derive(Debug, Clone)]
pub enum LoadedInstances {
    /// A validated configuration and its source.
    Configured {
        /// Validated descriptors.
        config: InstancesConfig,
        /// Where they were read from.
        source: InstanceSource,
    },
    /// No source was found and strict mode was off.
    Unconfigured {
        /// Sources tried, in order.
        searched: Vec<String>,
    },
}

/// Loads and validates instance descriptors.
pub struct InstanceConfigLoader;

impl InstanceConfigLoader {
    /// Load descriptors from the first source that exists.
    ///
    /// Sources are tried in order: explicit path, the file variable, the inline
    /// JSON variable, the default paths, then the legacy variables.
    pub fn load(options: &InstanceLoadOptions) -> InstanceResult<LoadedInstances> {
        let mut searched = Vec::new();

        let explicit = options
            .config_path
            .clone()
            .or_else(|| non_blank_env(&options.config_file_env).map(PathBuf::from));
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(InstanceError::ConfigNotFound {
                    searched: vec![path.display().to_string()],
                });
            }
            return Self::load_file(&path);
        }
        searched.push(format!("${}", options.config_file_env));

        if let Some(blob) = non_blank_env(&options.instances_env) {
            let source = InstanceSource::Env(options.instances_env.clone());
            let config = extract(Figment::from(Json::string(&blob)), &source)?;
            validate(&config, &source)?;
            tracing::info!(source = %source, instances = config.instances.len(), "Loaded instance configuration");
            return Ok(LoadedInstances::Configured { config, source });
        }
        searched.push(format!("${}", options.instances_env));

        for path in &options.default_paths {
            if path.is_file() {
                return Self::load_file(path);
            }
            searched.push(path.display().to_string());
        }

        if options.allow_legacy {
            if let Some(api_url) = non_blank_env(&options.legacy_url_env) {
                let config = legacy_config(api_url, &options.legacy_token_env);
                validate(&config, &InstanceSource::Legacy)?;
                tracing::warn!(
                    url_env = %options.legacy_url_env,
                    "Using legacy single-instance configuration"
                );
                return Ok(LoadedInstances::Configured {
                    config,
                    source: InstanceSource::Legacy,
                });
            }
            searched.push(format!("${}", options.legacy_url_env));
        }

        if options.strict {
            return Err(InstanceError::ConfigNotFound { searched });
        }

        tracing::debug!(?searched, "No instance configuration found, resolver left unconfigured");
        Ok(LoadedInstances::Unconfigured { searched })
    }

    /// Load and validate one descriptor file.
    pub fn load_file(path: &Path) -> InstanceResult<LoadedInstances> {
        let source = InstanceSource::File(path.to_path_buf());
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Figment::from(Yaml::file(path)),
            _ => Figment::from(Json::file(path)),
        };
        let config = extract(figment, &source)?;
        validate(&config, &source)?;
        tracing::info!(source = %source, instances = config.instances.len(), "Loaded instance configuration");
        Ok(LoadedInstances::Configured { config, source })
    }
}

fn non_blank_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extract(figment: Figment, source: &InstanceSource) -> InstanceResult<InstancesConfig> {
    figment.extract::<InstancesConfig>().map_err(|e| {
        let field = (!e.path.is_empty()).then(|| e.path.join("."));
        InstanceError::invalid(source.to_string(), field.as_deref(), e.kind.to_string())
    })
}

fn legacy_config(api_url: String, token_env: &str) -> InstancesConfig {
    let read_only_mode = non_blank_env(LEGACY_READ_ONLY_ENV)
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"));
    let default_workspace_id = non_blank_env(LEGACY_WORKSPACE_ENV).and_then(|v| v.parse().ok());

    InstancesConfig {
        version: Some("1.0".to_string()),
        default_instance: Some(LEGACY_INSTANCE_NAME.to_string()),
        instances: vec![InstanceDescriptor {
            name: LEGACY_INSTANCE_NAME.to_string(),
            api_url,
            api_token_env: token_env.to_string(),
            read_only_mode,
            default_workspace_id,
            description: Some("Synthesized from legacy environment variables".to_string()),
        }],
    }
}

/// Semantic validation of a parsed document.
pub fn validate(config: &InstancesConfig, source: &InstanceSource) -> InstanceResult<()> {
    let source_name = source.to_string();
    let invalid = |field: &str, reason: String| InstanceError::invalid(&source_name, Some(field), reason);

    let version = config
        .version
        .as_deref()
        .ok_or_else(|| invalid("version", "version is required".to_string()))?;
    let version_pattern = Regex::new(r"^(\d+)\.(\d+)$").map_err(|e| invalid("version", e.to_string()))?;
    let major: u32 = version_pattern
        .captures(version.trim())
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| invalid("version", format!("'{version}' is not a MAJOR.MINOR version")))?;
    if major != SUPPORTED_MAJOR_VERSION {
        return Err(invalid(
            "version",
            format!("unsupported version '{version}', expected {SUPPORTED_MAJOR_VERSION}.x"),
        ));
    }

    if config.instances.is_empty() {
        return Err(invalid("instances", "at least one instance is required".to_string()));
    }

    let mut seen = HashSet::new();
    for (index, instance) in config.instances.iter().enumerate() {
        let field = |name: &str| format!("instances[{index}].{name}");

        if instance.name.trim().is_empty() {
            return Err(invalid(&field("name"), "instance name cannot be empty".to_string()));
        }
        if !seen.insert(instance.name.as_str()) {
            return Err(invalid(
                &field("name"),
                format!("duplicate instance name '{}'", instance.name),
            ));
        }

        match Url::parse(&instance.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => {
                return Err(invalid(
                    &field("apiUrl"),
                    format!("'{}' must be an http(s) URL with a host (scheme: {})", instance.api_url, url.scheme()),
                ));
            }
            Err(e) => {
                return Err(invalid(
                    &field("apiUrl"),
                    format!("'{}' is not a valid URL: {e}", instance.api_url),
                ));
            }
        }

        if instance.api_token_env.trim().is_empty() {
            return Err(invalid(
                &field("apiTokenEnv"),
                "token environment variable name cannot be empty".to_string(),
            ));
        }

        if let Some(workspace_id) = instance.default_workspace_id {
            if workspace_id <= 0 {
                return Err(invalid(
                    &field("defaultWorkspaceId"),
                    format!("{workspace_id} is not a positive id"),
                ));
            }
        }
    }

    if let Some(default) = &config.default_instance {
        if config.find(default).is_none() {
            return Err(invalid(
                "defaultInstance",
                format!("default instance '{default}' is not defined"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::InstanceErrorKind;

    fn descriptor(name: &str, url: &str) -> InstanceDescriptor {
        InstanceDescriptor {
            name: name.to_string(),
            api_url: url.to_string(),
            api_token_env: format!("{}_TOKEN", name.to_uppercase()),
            read_only_mode: false,
            default_workspace_id: None,
            description: None,
        }
    }

    fn config(instances: Vec<InstanceDescriptor>) -> InstancesConfig {
        InstancesConfig {
            version: Some("1.0".to_string()),
            default_instance: None,
            instances,
        }
    }

    fn source() -> InstanceSource {
        InstanceSource::File(PathBuf::from("instances.json"))
    }

    fn field_of(err: InstanceError) -> Option<String> {
        match err {
            InstanceError::ConfigInvalid { field, .. } => field,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_config() {
        let cfg = config(vec![
            descriptor("prod", "https://acme.kanbanize.com/api/v2"),
            descriptor("dev", "http://localhost:8080/api/v2"),
        ]);
        assert!(validate(&cfg, &source()).is_ok());
    }

    #[test]
    fn test_missing_and_malformed_version() {
        let mut cfg = config(vec![descriptor("prod", "https://acme.kanbanize.com")]);
        cfg.version = None;
        assert_eq!(field_of(validate(&cfg, &source()).unwrap_err()).as_deref(), Some("version"));

        cfg.version = Some("one".to_string());
        assert_eq!(field_of(validate(&cfg, &source()).unwrap_err()).as_deref(), Some("version"));

        cfg.version = Some("2.0".to_string());
        assert_eq!(field_of(validate(&cfg, &source()).unwrap_err()).as_deref(), Some("version"));
    }

    #[test]
    fn test_zero_instances() {
        let err = validate(&config(vec![]), &source()).unwrap_err();
        assert_eq!(err.kind(), InstanceErrorKind::ConfigInvalid);
        assert_eq!(field_of(err).as_deref(), Some("instances"));
    }

    #[test]
    fn test_duplicate_names() {
        let cfg = config(vec![
            descriptor("prod", "https://a.kanbanize.com"),
            descriptor("prod", "https://b.kanbanize.com"),
        ]);
        let err = validate(&cfg, &source()).unwrap_err();
        assert!(err.to_string().contains("duplicate instance name 'prod'"));
        assert_eq!(field_of(err).as_deref(), Some("instances[1].name"));
    }

    #[test]
    fn test_invalid_urls() {
        for url in ["not a url", "ftp://files.example.com", "mailto:ops@example.com"] {
            let cfg = config(vec![descriptor("prod", url)]);
            let err = validate(&cfg, &source()).unwrap_err();
            assert_eq!(field_of(err).as_deref(), Some("instances[0].apiUrl"), "url: {url}");
        }
    }

    #[test]
    fn test_empty_token_env_name() {
        let mut inst = descriptor("prod", "https://acme.kanbanize.com");
        inst.api_token_env = "  ".to_string();
        let err = validate(&config(vec![inst]), &source()).unwrap_err();
        assert_eq!(field_of(err).as_deref(), Some("instances[0].apiTokenEnv"));
    }

    #[test]
    fn test_dangling_default_instance() {
        let mut cfg = config(vec![descriptor("prod", "https://acme.kanbanize.com")]);
        cfg.default_instance = Some("staging".to_string());
        let err = validate(&cfg, &source()).unwrap_err();
        assert!(err.to_string().contains("staging"));
        assert_eq!(field_of(err).as_deref(), Some("defaultInstance"));
    }

    #[test]
    fn test_non_positive_default_workspace() {
        let mut inst = descriptor("prod", "https://acme.kanbanize.com");
        inst.default_workspace_id = Some(0);
        let err = validate(&config(vec![inst]), &source()).unwrap_err();
        assert_eq!(field_of(err).as_deref(), Some("instances[0].defaultWorkspaceId"));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(InstanceSource::Env("BUSINESSMAP_INSTANCES".into()).to_string(), "$BUSINESSMAP_INSTANCES");
        assert_eq!(InstanceSource::Legacy.to_string(), "legacy environment");
    }
}
