use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use soulstore_object_store::Storage;
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::info;

use super::context::CliContext;

#[derive(Args, Clone)]
pub struct PutArgs {
    /// Object key, e.g. "reports/2024/summary.json"
    pub key: String,

    /// Read the object from this file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct GetArgs {
    /// Object key
    pub key: String,

    /// Write the object to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct DeleteArgs {
    /// Object or group key
    pub key: String,
}

pub async fn cmd_put(args: PutArgs, ctx: &CliContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let op = ctx.op_ctx();

    let result = match &args.file {
        Some(path) => {
            let mut file = fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            store.put(&op, &args.key, &mut file).await
        }
        None => {
            let mut stdin = io::stdin();
            store.put(&op, &args.key, &mut stdin).await
        }
    };
    result.with_context(|| format!("Failed to put {}", args.key))?;
    store.close().await?;

    info!(key = %args.key, "Stored object");
    Ok(())
}

pub async fn cmd_get(args: GetArgs, ctx: &CliContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let op = ctx.op_ctx();

    let mut reader = store
        .get(&op, &args.key)
        .await
        .with_context(|| format!("Failed to get {}", args.key))?;

    let copied = match &args.out {
        Some(path) => {
            let mut file = fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let copied = io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            copied
        }
        None => {
            let mut stdout = io::stdout();
            let copied = io::copy(&mut reader, &mut stdout).await?;
            stdout.flush().await?;
            copied
        }
    };
    drop(reader);
    store.close().await?;

    info!(key = %args.key, bytes = copied, "Fetched object");
    Ok(())
}

pub async fn cmd_delete(args: DeleteArgs, ctx: &CliContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let op = ctx.op_ctx();

    store
        .delete(&op, &args.key)
        .await
        .with_context(|| format!("Failed to delete {}", args.key))?;
    store.close().await?;

    info!(key = %args.key, "Deleted object");
    Ok(())
}
