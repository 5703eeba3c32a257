use clap::Subcommand;

use super::object::{DeleteArgs, GetArgs, PutArgs};

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Store an object read from a file or stdin
    Put(PutArgs),

    /// Write an object to a file or stdout
    Get(GetArgs),

    /// Delete an object, or every object under a group key
    Delete(DeleteArgs),

    /// Show build information and the effective storage configuration
    Info,
}
