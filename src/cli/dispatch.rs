use super::env::CliArgs;
use super::info::cmd_info;
use super::object::{cmd_delete, cmd_get, cmd_put};
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Put(args) => cmd_put(args, ctx).await,
        Commands::Get(args) => cmd_get(args, ctx).await,
        Commands::Delete(args) => cmd_delete(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
