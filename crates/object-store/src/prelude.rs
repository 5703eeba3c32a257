pub use crate::ctx::StoreCtx;
pub use crate::errors::{StoreError, StoreErrorKind};
pub use crate::local::{LocalStorage, MemFs, OsFs};
pub use crate::metrics::{StoreStats, StoreStatsSnapshot};
pub use crate::policy::{LocalPolicy, PutPolicy};
pub use crate::r#trait::{ObjectReader, Storage};
