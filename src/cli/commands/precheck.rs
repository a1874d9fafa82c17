//! Implementation of the `boardgate precheck` command.

use anyhow::Result;
use clap::Args;

use crate::application::{PrecheckReport, ProxyContext};
use crate::cli::output::{ids_to_json, list_table, output, CommandOutput};
use crate::domain::models::ResourceType;

/// Arguments of `boardgate precheck`.
#[derive(Args, Debug)]
pub struct PrecheckArgs {
    /// Resource kind: workspaces, boards or cards
    pub resource: ResourceType,

    /// Ids to check (or a single JSON array)
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Instance to query (the default instance when omitted)
    #[arg(short, long)]
    pub instance: Option<String>,
}

impl CommandOutput for PrecheckReport {
    fn to_human(&self) -> String {
        let deps = &self.dependencies;
        let mut table = list_table(&["id", "name", "dependents"]);
        for item in &deps.with_dependents {
            table.add_row(vec![
                item.id.to_string(),
                item.name.clone(),
                format!("{} {}", item.dependent_count, self.resource.dependent_label()),
            ]);
        }
        for item in &deps.without_dependents {
            table.add_row(vec![item.id.to_string(), item.name.clone(), "-".to_string()]);
        }

        let headline = if deps.has_dependents() {
            format!(
                "{} of {} {}s on '{}' still have {} ({} total)",
                deps.with_dependents.len(),
                deps.with_dependents.len() + deps.without_dependents.len(),
                self.resource.key_segment(),
                self.instance,
                self.resource.dependent_label(),
                deps.total_dependents()
            )
        } else {
            format!(
                "No {}s on '{}' have {}",
                self.resource.key_segment(),
                self.instance,
                self.resource.dependent_label()
            )
        };
        format!("{headline}\n{table}")
    }
}

/// Print the dependency precheck for the given ids.
pub async fn execute(args: PrecheckArgs, context: &ProxyContext, json_mode: bool) -> Result<()> {
    let ids = ids_to_json(&args.ids);
    let report = context
        .precheck(args.instance.as_deref(), args.resource, &ids)
        .await?;
    output(&report, json_mode);
    Ok(())
}
