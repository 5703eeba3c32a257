use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use soulstore_object_store::{LocalStorage, StoreCtx};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;

pub struct CliContext {
    config: Config,
    config_path: PathBuf,
    timeout: Option<Duration>,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf, timeout_secs: Option<u64>) -> Self {
        Self {
            config,
            config_path,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub async fn open_store(&self) -> Result<LocalStorage> {
        LocalStorage::open_with_policy(self.config.root.clone(), self.config.policy.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to open storage root {}",
                    self.config.root.display()
                )
            })
    }

    /// Context for one command: cancelled on Ctrl-C, bounded by `--timeout`.
    pub fn op_ctx(&self) -> StoreCtx {
        let token = CancellationToken::new();
        spawn_ctrl_c_cancel(token.clone());
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        StoreCtx::new(token, deadline)
    }
}

fn spawn_ctrl_c_cancel(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    warn!("Interrupted, cancelling storage operation");
                    token.cancel();
                }
                Err(err) => warn!(?err, "failed to listen for ctrl-c"),
            },
            _ = token.cancelled() => {}
        }
    });
}
