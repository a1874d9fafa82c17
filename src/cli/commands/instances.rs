//! Implementation of the `boardgate instances` command.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::application::{ProxyContext, ProxyError};
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::{InstanceSummary, ResolutionStrategy};
use crate::services::CachedClientInfo;

/// Arguments of `boardgate instances`.
#[derive(Args, Debug)]
pub struct InstancesArgs {
    /// Instances subcommand.
    #[command(subcommand)]
    pub command: InstancesCommands,
}

/// Subcommands of `boardgate instances`.
#[derive(Subcommand, Debug)]
pub enum InstancesCommands {
    /// List configured instances
    List,
    /// Show one instance (the default instance when NAME is omitted)
    Show {
        /// Instance name
        name: Option<String>,
    },
}

/// Every configured instance.
#[derive(Debug, Serialize)]
pub struct InstanceListOutput {
    /// Configured default instance.
    pub default_instance: Option<String>,
    /// Instances in configuration order.
    pub instances: Vec<InstanceSummary>,
}

impl CommandOutput for InstanceListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["", "name", "api url", "mode", "workspace", "description"]);
        for instance in &self.instances {
            let marker = if self.default_instance.as_deref() == Some(instance.name.as_str()) {
                "*"
            } else {
                ""
            };
            table.add_row(vec![
                marker.to_string(),
                instance.name.clone(),
                instance.api_url.clone(),
                mode_label(instance.read_only_mode).to_string(),
                instance
                    .default_workspace_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                instance.description.clone().unwrap_or_default(),
            ]);
        }
        render_list("instance", &table, self.instances.len())
    }
}

/// One instance with its cached client, if any.
#[derive(Debug, Serialize)]
pub struct InstanceShowOutput {
    /// Instance details.
    pub instance: InstanceSummary,
    /// How the name was resolved.
    pub strategy: ResolutionStrategy,
    /// Cached client for the instance, if one exists.
    pub cached_client: Option<CachedClientInfo>,
}

impl CommandOutput for InstanceShowOutput {
    fn to_human(&self) -> String {
        let i = &self.instance;
        let mut lines = vec![
            format!("Name:        {}", i.name),
            format!("API URL:     {}", i.api_url),
            format!("Mode:        {}", mode_label(i.read_only_mode)),
            format!("Resolved by: {}", self.strategy),
        ];
        if let Some(id) = i.default_workspace_id {
            lines.push(format!("Workspace:   {id}"));
        }
        if let Some(description) = &i.description {
            lines.push(format!("Description: {description}"));
        }
        match &self.cached_client {
            Some(info) if info.ready => lines.push(format!(
                "Client:      cached ({}), created {}",
                info.handle.map(|h| h.to_string()).unwrap_or_default(),
                info.created_at.map(|t| t.to_rfc3339()).unwrap_or_default()
            )),
            Some(_) => lines.push("Client:      building".to_string()),
            None => lines.push("Client:      not created".to_string()),
        }
        lines.join("\n")
    }
}

const fn mode_label(read_only: bool) -> &'static str {
    if read_only {
        "read-only"
    } else {
        "read-write"
    }
}

/// Run an `instances` subcommand.
pub fn execute(args: InstancesArgs, context: &ProxyContext, json_mode: bool) -> Result<()> {
    match args.command {
        InstancesCommands::List => cmd_list(context, json_mode),
        InstancesCommands::Show { name } => cmd_show(context, name.as_deref(), json_mode),
    }
}

fn cmd_list(context: &ProxyContext, json_mode: bool) -> Result<()> {
    let clients = context.clients();
    let result = InstanceListOutput {
        default_instance: clients.default_instance_name().map_err(ProxyError::from)?,
        instances: clients.list_instances().map_err(ProxyError::from)?,
    };
    output(&result, json_mode);
    Ok(())
}

fn cmd_show(context: &ProxyContext, name: Option<&str>, json_mode: bool) -> Result<()> {
    let clients = context.clients();
    let instance = clients.instance_info(name).map_err(ProxyError::from)?;
    let strategy = clients.resolution_strategy(name).map_err(ProxyError::from)?;
    let cached_client = clients
        .cached_clients()
        .into_iter()
        .find(|info| info.instance_name == instance.name);

    output(
        &InstanceShowOutput {
            instance,
            strategy,
            cached_client,
        },
        json_mode,
    );
    Ok(())
}
