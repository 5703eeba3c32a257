//! Object storage behind the [`Storage`] capability contract, with a local
//! filesystem backend.

pub mod ctx;
pub mod errors;
pub mod key;
pub mod local;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod r#trait;

pub use crate::ctx::StoreCtx;
pub use crate::errors::{StoreError, StoreErrorKind, StoreResult};
pub use crate::local::{EntryKind, FsOps, LocalStorage, MemFs, OsFs};
pub use crate::metrics::{StoreStats, StoreStatsSnapshot};
pub use crate::policy::{LocalPolicy, PutPolicy};
pub use crate::r#trait::{ObjectReader, Storage};
