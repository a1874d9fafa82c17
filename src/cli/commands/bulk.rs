//! Implementation of the `boardgate bulk` command.
//!
//! Destructive actions only run with `--yes`; without it the command prints
//! the dependency precheck for the ids and stops.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::application::{BulkReport, PrecheckReport, ProxyContext};
use crate::cli::output::{ids_to_json, list_table, output, CommandOutput};
use crate::domain::models::{BulkAction, BulkOutcome, CardUpdate};

/// Arguments of `boardgate bulk`.
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Bulk action to run.
    #[command(subcommand)]
    pub command: BulkCommands,
}

/// Subcommands of `boardgate bulk`.
#[derive(Subcommand, Debug)]
pub enum BulkCommands {
    /// Archive workspaces
    ArchiveWorkspaces(BulkTargetArgs),
    /// Archive boards
    ArchiveBoards(BulkTargetArgs),
    /// Delete boards
    DeleteBoards(BulkTargetArgs),
    /// Delete cards
    DeleteCards(BulkTargetArgs),
    /// Apply the same field changes to several cards
    UpdateCards {
        /// Cards to update.
        #[command(flatten)]
        target: BulkTargetArgs,
        /// New card title
        #[arg(long)]
        title: Option<String>,
        /// Move cards to this column
        #[arg(long)]
        column_id: Option<i64>,
        /// Move cards to this lane
        #[arg(long)]
        lane_id: Option<i64>,
        /// Assign cards to this user
        #[arg(long)]
        owner_user_id: Option<i64>,
        /// Set card priority
        #[arg(long)]
        priority: Option<i64>,
    },
}

/// Ids and instance shared by every bulk action.
#[derive(Args, Debug)]
pub struct BulkTargetArgs {
    /// Ids to process (or a single JSON array)
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Target instance (the default instance when omitted)
    #[arg(short, long)]
    pub instance: Option<String>,

    /// Run destructive actions without stopping at the precheck
    #[arg(short, long)]
    pub yes: bool,
}

impl CommandOutput for BulkReport {
    fn to_human(&self) -> String {
        let status = match self.outcome {
            BulkOutcome::Empty | BulkOutcome::Completed => console::style("done").green().bold(),
            BulkOutcome::PartialSuccess => console::style("partial").yellow().bold(),
            BulkOutcome::Failed => console::style("failed").red().bold(),
        };

        let mut table = list_table(&["id", "name", "result"]);
        for result in &self.results {
            let name = self
                .name_of(result.id)
                .map_or_else(|| self.resource.fallback_name(result.id), str::to_string);
            let outcome = match &result.error {
                None => "ok".to_string(),
                Some(error) => error.clone(),
            };
            table.add_row(vec![result.id.to_string(), name, outcome]);
        }

        if self.results.is_empty() {
            format!("{status} {}", self.message())
        } else {
            format!("{status} {}\n{table}", self.message())
        }
    }
}

/// Precheck shown instead of running a destructive action.
#[derive(Debug, Serialize)]
pub struct ConfirmationOutput {
    /// Action that was requested.
    pub action: BulkAction,
    /// False when the action was held back for confirmation.
    pub executed: bool,
    /// Dependency precheck for the ids.
    pub precheck: PrecheckReport,
}

impl CommandOutput for ConfirmationOutput {
    fn to_human(&self) -> String {
        format!(
            "{}\n\nNothing changed. Re-run with --yes to {}.",
            self.precheck.to_human(),
            self.action
        )
    }
}

/// Run a bulk action, or only its precheck when `--yes` is missing.
pub async fn execute(args: BulkArgs, context: &ProxyContext, json_mode: bool) -> Result<()> {
    let (action, target, update) = match args.command {
        BulkCommands::ArchiveWorkspaces(target) => (BulkAction::ArchiveWorkspaces, target, None),
        BulkCommands::ArchiveBoards(target) => (BulkAction::ArchiveBoards, target, None),
        BulkCommands::DeleteBoards(target) => (BulkAction::DeleteBoards, target, None),
        BulkCommands::DeleteCards(target) => (BulkAction::DeleteCards, target, None),
        BulkCommands::UpdateCards {
            target,
            title,
            column_id,
            lane_id,
            owner_user_id,
            priority,
        } => (
            BulkAction::UpdateCards,
            target,
            Some(CardUpdate {
                title,
                column_id,
                lane_id,
                owner_user_id,
                priority,
            }),
        ),
    };

    let ids = ids_to_json(&target.ids);
    let instance = target.instance.as_deref();

    if action.is_destructive() && !target.yes {
        let precheck = context.precheck(instance, action.resource(), &ids).await?;
        output(
            &ConfirmationOutput {
                action,
                executed: false,
                precheck,
            },
            json_mode,
        );
        return Ok(());
    }

    let report = match (action, update) {
        (BulkAction::ArchiveWorkspaces, _) => context.archive_workspaces(instance, &ids).await?,
        (BulkAction::ArchiveBoards, _) => context.archive_boards(instance, &ids).await?,
        (BulkAction::DeleteBoards, _) => context.delete_boards(instance, &ids).await?,
        (BulkAction::DeleteCards, _) => context.delete_cards(instance, &ids).await?,
        (BulkAction::UpdateCards, update) => {
            context
                .update_cards(instance, &ids, &update.unwrap_or_default())
                .await?
        }
    };

    output(&report, json_mode);
    if report.outcome == BulkOutcome::Failed {
        anyhow::bail!("every item failed: {}", report.message());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::types::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_parse_update_cards() {
        let cli = Cli::try_parse_from([
            "boardgate",
            "bulk",
            "update-cards",
            "1",
            "2",
            "--column-id",
            "7",
            "--instance",
            "prod",
        ])
        .unwrap();

        let Commands::Bulk(BulkArgs {
            command: BulkCommands::UpdateCards {
                target, column_id, ..
            },
        }) = cli.command
        else {
            panic!("expected bulk update-cards");
        };
        assert_eq!(target.ids, vec!["1", "2"]);
        assert_eq!(target.instance.as_deref(), Some("prod"));
        assert!(!target.yes);
        assert_eq!(column_id, Some(7));
    }

    #[test]
    fn test_parse_requires_ids() {
        assert!(Cli::try_parse_from(["boardgate", "bulk", "delete-cards"]).is_err());
    }
}
