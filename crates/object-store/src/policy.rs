use serde::{Deserialize, Serialize};

/// Mode used when no policy overrides it: all permissions for all classes.
pub const DEFAULT_MODE: u32 = 0o777;

/// What `put` does when an object already exists at the key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PutPolicy {
    /// Replace the existing object with the new one.
    #[default]
    Overwrite,
    /// Fail with `AlreadyExists`.
    RejectExisting,
}

/// Tunables for [`crate::LocalStorage`].
///
/// Modes only take effect on Unix hosts. `file_mode` is applied exactly;
/// `dir_mode` is still subject to the process umask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPolicy {
    #[serde(default = "default_mode")]
    pub file_mode: u32,
    #[serde(default = "default_mode")]
    pub dir_mode: u32,
    #[serde(default)]
    pub put_policy: PutPolicy,
}

impl Default for LocalPolicy {
    fn default() -> Self {
        Self {
            file_mode: DEFAULT_MODE,
            dir_mode: DEFAULT_MODE,
            put_policy: PutPolicy::Overwrite,
        }
    }
}

impl LocalPolicy {
    pub fn with_put_policy(mut self, put_policy: PutPolicy) -> Self {
        self.put_policy = put_policy;
        self
    }

    pub fn with_modes(mut self, file_mode: u32, dir_mode: u32) -> Self {
        self.file_mode = file_mode;
        self.dir_mode = dir_mode;
        self
    }
}

fn default_mode() -> u32 {
    DEFAULT_MODE
}
