//! Boardgate CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use boardgate::application::ProxyContext;
use boardgate::cli::{commands, handle_error, Cli, Commands};
use boardgate::domain::models::Config;
use boardgate::infrastructure::config::ConfigLoader;
use boardgate::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(&err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    if let Some(path) = cli.instances_file {
        config.instances.config_path = Some(path);
    }

    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;
    let context = ProxyContext::new(&config);

    match cli.command {
        Commands::Instances(args) => commands::instances::execute(args, &context, cli.json),
        Commands::Ping(args) => commands::ping::execute(args, &context, cli.json).await,
        Commands::Precheck(args) => commands::precheck::execute(args, &context, cli.json).await,
        Commands::Bulk(args) => commands::bulk::execute(args, &context, cli.json).await,
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
