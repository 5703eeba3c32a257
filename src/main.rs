mod cli;
mod config;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cli::app::run().await
}
