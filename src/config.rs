//! CLI configuration file model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use soulstore_object_store::LocalPolicy;

/// Environment variable that overrides `root` from the config file.
pub const ROOT_ENV: &str = "SOULSTORE_ROOT";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Storage root directory
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default)]
    pub policy: LocalPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            policy: LocalPolicy::default(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}
