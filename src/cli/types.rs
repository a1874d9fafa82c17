//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::bulk::BulkArgs;
use super::commands::instances::InstancesArgs;
use super::commands::ping::PingArgs;
use super::commands::precheck::PrecheckArgs;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "boardgate")]
#[command(about = "Boardgate - multi-instance Businessmap access layer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Settings file (YAML) replacing the .boardgate/ lookup
    #[arg(long, global = true, env = "BOARDGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Instance configuration file (JSON or YAML)
    #[arg(long, global = true)]
    pub instances_file: Option<PathBuf>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect configured instances
    Instances(InstancesArgs),

    /// Build a client for an instance and verify its credentials
    Ping(PingArgs),

    /// Resolve names and dependents ahead of a destructive bulk operation
    Precheck(PrecheckArgs),

    /// Run a bulk write against an instance
    Bulk(BulkArgs),
}
