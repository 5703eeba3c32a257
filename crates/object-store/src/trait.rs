use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::ctx::StoreCtx;
use crate::errors::StoreError;

/// Readable handle over one stored object. Dropping it releases the
/// underlying file.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Capability contract every storage backend satisfies.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Consumes `reader` to the end and stores the bytes under `key`,
    /// replacing any object already there.
    async fn put(
        &self,
        ctx: &StoreCtx,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StoreError>;

    /// Opens the object at `key`, positioned at its first byte.
    async fn get(&self, ctx: &StoreCtx, key: &str) -> Result<ObjectReader, StoreError>;

    /// Removes the object (or subtree) at `key`. Missing keys are not an
    /// error.
    async fn delete(&self, ctx: &StoreCtx, key: &str) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}
