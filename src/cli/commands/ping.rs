//! Implementation of the `boardgate ping` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::application::{ProxyContext, ProxyError};
use crate::cli::output::{output, CommandOutput};
use crate::services::ClientHandle;

/// Arguments of `boardgate ping`.
#[derive(Args, Debug)]
pub struct PingArgs {
    /// Instance to ping (the default instance when omitted)
    #[arg(short, long)]
    pub instance: Option<String>,
}

/// Identity reported by a successful ping.
#[derive(Debug, Serialize)]
pub struct PingOutput {
    /// Resolved instance name.
    pub instance: String,
    /// Client that answered.
    pub handle: ClientHandle,
    /// Whether the instance refuses writes.
    pub read_only: bool,
    /// Owner of the API token.
    pub user_id: i64,
    /// Username of the token owner, when the backend reports one.
    pub username: Option<String>,
}

impl CommandOutput for PingOutput {
    fn to_human(&self) -> String {
        let user = self
            .username
            .clone()
            .unwrap_or_else(|| format!("user {}", self.user_id));
        let mode = if self.read_only { " (read-only)" } else { "" };
        format!(
            "{} '{}'{mode} reachable, authenticated as {user}",
            console::style("ok").green().bold(),
            self.instance
        )
    }
}

/// Resolve the instance, build its client and report who the token belongs to.
pub async fn execute(args: PingArgs, context: &ProxyContext, json_mode: bool) -> Result<()> {
    let managed = context.client(args.instance.as_deref()).await?;
    let user = managed.initialize().await.map_err(ProxyError::from)?;

    output(
        &PingOutput {
            instance: managed.instance_name().to_string(),
            handle: managed.handle(),
            read_only: managed.is_read_only(),
            user_id: user.user_id,
            username: user.username,
        },
        json_mode,
    );
    Ok(())
}
