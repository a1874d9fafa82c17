//! Active instance resolution.
//!
//! Resolution picks a descriptor (explicit name, configured default, or the
//! legacy instance) and reads its API token from the environment. The token is
//! read on every call so that rotated credentials take effect without a reload.

use crate::domain::errors::{InstanceError, InstanceResult};
use crate::domain::models::{
    InstanceDescriptor, InstanceSummary, InstancesConfig, ResolutionStrategy, ResolvedInstance,
};
use crate::infrastructure::credentials::read_token;

use super::instances::{InstanceConfigLoader, InstanceLoadOptions, InstanceSource, LoadedInstances};

/// Resolves instance names to descriptors and credentials.
#[derive(Debug, Clone)]
pub struct InstanceResolver {
    loaded: LoadedInstances,
}

impl InstanceResolver {
    /// Load descriptors according to `options`.
    pub fn load(options: &InstanceLoadOptions) -> InstanceResult<Self> {
        Ok(Self {
            loaded: InstanceConfigLoader::load(options)?,
        })
    }

    /// Build a resolver from an in-memory document, validating it first.
    pub fn from_config(config: InstancesConfig, source: InstanceSource) -> InstanceResult<Self> {
        super::instances::validate(&config, &source)?;
        Ok(Self {
            loaded: LoadedInstances::Configured { config, source },
        })
    }

    /// Whether any instance configuration was found.
    pub fn is_configured(&self) -> bool {
        matches!(self.loaded, LoadedInstances::Configured { .. })
    }

    /// Whether the single instance came from the legacy variables.
    pub fn is_legacy(&self) -> bool {
        matches!(
            self.loaded,
            LoadedInstances::Configured {
                source: InstanceSource::Legacy,
                ..
            }
        )
    }

    /// Where the configuration came from, if any.
    pub fn source(&self) -> Option<&InstanceSource> {
        match &self.loaded {
            LoadedInstances::Configured { source, .. } => Some(source),
            LoadedInstances::Unconfigured { .. } => None,
        }
    }

    fn config(&self) -> InstanceResult<&InstancesConfig> {
        match &self.loaded {
            LoadedInstances::Configured { config, .. } => Ok(config),
            LoadedInstances::Unconfigured { searched } => Err(InstanceError::ConfigNotFound {
                searched: searched.clone(),
            }),
        }
    }

    /// All configured descriptors, in declaration order.
    pub fn instances(&self) -> &[InstanceDescriptor] {
        match &self.loaded {
            LoadedInstances::Configured { config, .. } => &config.instances,
            LoadedInstances::Unconfigured { .. } => &[],
        }
    }

    /// Non-secret views of every configured instance.
    pub fn list_instances(&self) -> Vec<InstanceSummary> {
        self.instances()
            .iter()
            .map(|descriptor| InstanceSummary::new(descriptor, None))
            .collect()
    }

    /// The instance used when a call names none: the configured default, or
    /// the first declared instance.
    pub fn default_instance_name(&self) -> Option<&str> {
        let LoadedInstances::Configured { config, .. } = &self.loaded else {
            return None;
        };
        config
            .default_instance
            .as_deref()
            .or_else(|| config.instances.first().map(|i| i.name.as_str()))
    }

    /// Pick the descriptor for `name` without reading its credential.
    pub fn descriptor(
        &self,
        name: Option<&str>,
    ) -> InstanceResult<(&InstanceDescriptor, ResolutionStrategy)> {
        let config = self.config()?;
        let requested = name.map(str::trim).filter(|n| !n.is_empty());

        let (target, strategy) = match requested {
            Some(name) => (name, ResolutionStrategy::Explicit),
            None => {
                let default = self.default_instance_name().ok_or_else(|| {
                    InstanceError::InstanceNotFound {
                        name: "(default)".to_string(),
                        available: config.names(),
                    }
                })?;
                (default, ResolutionStrategy::Default)
            }
        };
        let strategy = if self.is_legacy() {
            ResolutionStrategy::Legacy
        } else {
            strategy
        };

        config
            .find(target)
            .map(|descriptor| (descriptor, strategy))
            .ok_or_else(|| InstanceError::InstanceNotFound {
                name: target.to_string(),
                available: config.names(),
            })
    }

    /// Resolve the active instance and read its credential.
    pub fn get_active_instance(&self, name: Option<&str>) -> InstanceResult<ResolvedInstance> {
        let (descriptor, strategy) = self.descriptor(name)?;
        let api_token =
            read_token(&descriptor.api_token_env).ok_or_else(|| InstanceError::TokenMissing {
                instance: descriptor.name.clone(),
                env_var: descriptor.api_token_env.clone(),
            })?;

        tracing::debug!(instance = %descriptor.name, strategy = %strategy, "Resolved instance");
        Ok(ResolvedInstance {
            descriptor: descriptor.clone(),
            api_token,
            strategy,
        })
    }

    /// Non-secret view of the instance `name` would resolve to.
    pub fn instance_summary(&self, name: Option<&str>) -> InstanceResult<InstanceSummary> {
        let (descriptor, strategy) = self.descriptor(name)?;
        Ok(InstanceSummary::new(descriptor, Some(strategy)))
    }
}
