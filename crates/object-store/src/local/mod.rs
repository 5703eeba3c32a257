//! Local filesystem backend.
//!
//! Objects are plain files at `root/<key>`; keys containing `/` produce
//! nested directories. No sidecar metadata is written.

mod mem;
mod ops;

pub use mem::MemFs;
pub use ops::{EntryKind, FsOps, OsFs};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::{
    ctx::StoreCtx,
    errors::{StoreError, StoreErrorKind, StoreResult},
    key::{ensure_key, object_path},
    metrics::StoreStats,
    policy::{LocalPolicy, PutPolicy},
    r#trait::{ObjectReader, Storage},
};

/// Storage rooted at a directory.
///
/// Immutable after construction; clones share the filesystem handle and
/// the stats counters.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    fs: Arc<dyn FsOps>,
    policy: LocalPolicy,
    stats: StoreStats,
}

impl LocalStorage {
    /// Opens (creating if needed) a store on the host filesystem.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_fs(Arc::new(OsFs), root, LocalPolicy::default()).await
    }

    pub async fn open_with_policy(
        root: impl Into<PathBuf>,
        policy: LocalPolicy,
    ) -> StoreResult<Self> {
        Self::with_fs(Arc::new(OsFs), root, policy).await
    }

    /// Opens a store on top of any [`FsOps`] implementation.
    ///
    /// The root and all missing parents are created with the policy's
    /// directory mode, then the root is canonicalized.
    pub async fn with_fs(
        fs: Arc<dyn FsOps>,
        root: impl Into<PathBuf>,
        policy: LocalPolicy,
    ) -> StoreResult<Self> {
        let root = root.into();
        match fs
            .stat(&root)
            .await
            .map_err(|err| StoreError::io("stat root", &root, err))?
        {
            Some(EntryKind::Dir) => {}
            Some(EntryKind::File) => {
                return Err(StoreError::io(
                    "create root",
                    &root,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "storage root exists and is not a directory",
                    ),
                ));
            }
            None => fs
                .create_dir_all(&root, policy.dir_mode)
                .await
                .map_err(|err| StoreError::io("create root", &root, err))?,
        }
        let root = fs
            .canonicalize(&root)
            .await
            .map_err(|err| StoreError::io("canonicalize root", &root, err))?;

        info!(root = %root.display(), put_policy = ?policy.put_policy, "local storage ready");
        Ok(Self {
            root,
            fs,
            policy,
            stats: StoreStats::default(),
        })
    }

    pub fn with_stats(mut self, stats: StoreStats) -> Self {
        self.stats = stats;
        self
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &LocalPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Validates `key` and returns its path under the root.
    pub async fn resolve(&self, key: &str) -> StoreResult<PathBuf> {
        ensure_key(key)?;
        let path = object_path(&self.root, key)?;
        self.ensure_contained(key, &path).await?;
        Ok(path)
    }

    /// The nearest existing ancestor of `path`, once symlinks are followed,
    /// must still sit under the root.
    async fn ensure_contained(&self, key: &str, path: &Path) -> StoreResult<()> {
        for ancestor in path.ancestors() {
            if ancestor == self.root {
                return Ok(());
            }
            let found = self
                .fs
                .stat(ancestor)
                .await
                .map_err(|err| StoreError::io("stat", ancestor, err))?;
            if found.is_none() {
                continue;
            }
            let real = self
                .fs
                .canonicalize(ancestor)
                .await
                .map_err(|err| StoreError::io("canonicalize", ancestor, err))?;
            if !real.starts_with(&self.root) {
                return Err(StoreError::invalid_key(key, "path escapes storage root"));
            }
            return Ok(());
        }
        Err(StoreError::invalid_key(key, "path escapes storage root"))
    }

    async fn stat(&self, path: &Path) -> StoreResult<Option<EntryKind>> {
        self.fs
            .stat(path)
            .await
            .map_err(|err| StoreError::io("stat object", path, err))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        ctx: &StoreCtx,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StoreError> {
        ctx.check()?;
        let path = self.resolve(key).await?;

        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent, self.policy.dir_mode)
                .await
                .map_err(|err| StoreError::io("create parent dir", parent, err))?;
        }

        let existing = self.stat(&path).await?;
        match (existing, self.policy.put_policy) {
            (Some(EntryKind::Dir), _) => {
                return Err(StoreError::io(
                    "replace object",
                    &path,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "a directory occupies this key",
                    ),
                ));
            }
            (Some(EntryKind::File), PutPolicy::RejectExisting) => {
                return Err(StoreErrorKind::AlreadyExists(key.to_string()).into());
            }
            _ => {}
        }

        let mut data = Vec::new();
        ctx.guard(async {
            reader
                .read_to_end(&mut data)
                .await
                .map_err(|err| StoreError::io("read input", &path, err))
        })
        .await?;
        ctx.check()?;

        // write_new replaces any existing file in one step
        self.fs
            .write_new(&path, &data, self.policy.file_mode)
            .await
            .map_err(|err| StoreError::io("write object", &path, err))?;

        self.stats.record_put(data.len() as u64);
        debug!(
            key,
            bytes = data.len(),
            replaced = existing.is_some(),
            path = %path.display(),
            "object stored"
        );
        Ok(())
    }

    async fn get(&self, ctx: &StoreCtx, key: &str) -> Result<ObjectReader, StoreError> {
        ctx.check()?;
        let path = self.resolve(key).await?;

        match self.stat(&path).await? {
            Some(EntryKind::File) => {}
            Some(EntryKind::Dir) | None => return Err(StoreError::not_found(key)),
        }

        let reader = self.fs.open(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::not_found(key)
            } else {
                StoreError::io("open object", &path, err)
            }
        })?;

        self.stats.record_get();
        debug!(key, "object opened");
        Ok(reader)
    }

    async fn delete(&self, ctx: &StoreCtx, key: &str) -> Result<(), StoreError> {
        ctx.check()?;
        let path = self.resolve(key).await?;

        let removed = match self.stat(&path).await? {
            None => Ok(()),
            Some(EntryKind::File) => self.fs.remove_file(&path).await,
            Some(EntryKind::Dir) => self.fs.remove_dir_all(&path).await,
        };
        match removed {
            Ok(()) => {}
            // lost a race with another deleter
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io("delete object", &path, err)),
        }

        self.stats.record_delete();
        debug!(key, "object deleted");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        debug!(root = %self.root.display(), "local storage closed");
        Ok(())
    }
}

#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert_traits<T: Send + Sync>() {}
    assert_traits::<LocalStorage>();
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mem_store(policy: LocalPolicy) -> (Arc<MemFs>, LocalStorage) {
        let fs = Arc::new(MemFs::new());
        let store = LocalStorage::with_fs(fs.clone(), "/mem/root", policy)
            .await
            .unwrap();
        (fs, store)
    }

    async fn read_all(mut reader: ObjectReader) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn constructor_creates_root_chain() {
        let (fs, store) = mem_store(LocalPolicy::default()).await;
        assert_eq!(store.root(), Path::new("/mem/root"));
        assert_eq!(
            fs.stat(Path::new("/mem")).await.unwrap(),
            Some(EntryKind::Dir)
        );
    }

    #[tokio::test]
    async fn constructor_rejects_file_root() {
        let fs = Arc::new(MemFs::new());
        fs.create_dir_all(Path::new("/mem"), 0o777).await.unwrap();
        fs.write_new(Path::new("/mem/root"), b"x", 0o644)
            .await
            .unwrap();
        let err = LocalStorage::with_fs(fs, "/mem/root", LocalPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::Io { op: "create root", .. }));
    }

    #[tokio::test]
    async fn put_maps_key_under_root_with_policy_modes() {
        let policy = LocalPolicy::default().with_modes(0o640, 0o750);
        let (fs, store) = mem_store(policy).await;
        let ctx = StoreCtx::background();

        store
            .put(&ctx, "group/file", &mut &b"payload"[..])
            .await
            .unwrap();

        let path = Path::new("/mem/root/group/file");
        assert_eq!(fs.contents(path).unwrap(), b"payload");
        assert_eq!(fs.mode(path), Some(0o640));
        assert_eq!(fs.mode(Path::new("/mem/root/group")), Some(0o750));
    }

    #[tokio::test]
    async fn dot_segments_resolve_inside_root() {
        let (fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();

        store.put(&ctx, "a/../b", &mut &b"1"[..]).await.unwrap();
        assert_eq!(fs.contents(Path::new("/mem/root/b")).unwrap(), b"1");
        assert_eq!(read_all(store.get(&ctx, "./b").await.unwrap()).await, b"1");
    }

    #[tokio::test]
    async fn escaping_keys_never_touch_the_filesystem() {
        let (fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();
        let before = fs.len();

        for key in ["../x", "a/../../x", "a/.."] {
            let err = store.put(&ctx, key, &mut &b"x"[..]).await.unwrap_err();
            assert!(err.is_invalid_key(), "{key}");
            assert!(store.delete(&ctx, key).await.unwrap_err().is_invalid_key());
        }
        assert_eq!(fs.len(), before);
    }

    #[tokio::test]
    async fn reject_policy_keeps_first_object() {
        let (fs, store) =
            mem_store(LocalPolicy::default().with_put_policy(PutPolicy::RejectExisting)).await;
        let ctx = StoreCtx::background();

        store.put(&ctx, "once", &mut &b"v1"[..]).await.unwrap();
        let err = store.put(&ctx, "once", &mut &b"v2"[..]).await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::AlreadyExists(k) if k == "once"));
        assert_eq!(fs.contents(Path::new("/mem/root/once")).unwrap(), b"v1");
    }

    /// Delegates to `MemFs` but refuses every write once `broken` is set.
    #[derive(Debug, Default)]
    struct BrokenWrites {
        inner: MemFs,
        broken: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl FsOps for BrokenWrites {
        async fn stat(&self, path: &Path) -> io::Result<Option<EntryKind>> {
            self.inner.stat(path).await
        }

        async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
            self.inner.create_dir_all(path, mode).await
        }

        async fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.inner.remove_file(path).await
        }

        async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            self.inner.remove_dir_all(path).await
        }

        async fn write_new(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
            if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.inner.write_new(path, data, mode).await
        }

        async fn open(&self, path: &Path) -> io::Result<ObjectReader> {
            self.inner.open(path).await
        }

        async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            self.inner.canonicalize(path).await
        }
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_previous_object() {
        let fs = Arc::new(BrokenWrites::default());
        let store = LocalStorage::with_fs(fs.clone(), "/mem/root", LocalPolicy::default())
            .await
            .unwrap();
        let ctx = StoreCtx::background();

        store.put(&ctx, "keep", &mut &b"v1"[..]).await.unwrap();
        fs.broken.store(true, std::sync::atomic::Ordering::SeqCst);

        let err = store.put(&ctx, "keep", &mut &b"v2"[..]).await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::Io { op: "write object", .. }));
        assert_eq!(read_all(store.get(&ctx, "keep").await.unwrap()).await, b"v1");
        assert_eq!(store.stats().snapshot().puts, 1);
    }

    #[tokio::test]
    async fn put_onto_directory_node_fails() {
        let (_fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();

        store.put(&ctx, "dir/child", &mut &b"c"[..]).await.unwrap();
        let err = store.put(&ctx, "dir", &mut &b"d"[..]).await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::Io { .. }));
    }

    #[tokio::test]
    async fn get_on_directory_node_is_not_found() {
        let (_fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();

        store.put(&ctx, "dir/child", &mut &b"c"[..]).await.unwrap();
        let err = store.get(&ctx, "dir").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_removes_subtree() {
        let (fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();

        store.put(&ctx, "tree/a", &mut &b"a"[..]).await.unwrap();
        store.put(&ctx, "tree/b/c", &mut &b"c"[..]).await.unwrap();
        store.delete(&ctx, "tree").await.unwrap();

        assert_eq!(fs.stat(Path::new("/mem/root/tree")).await.unwrap(), None);
        assert!(store.get(&ctx, "tree/b/c").await.err().unwrap().is_not_found());
        assert_eq!(
            fs.stat(Path::new("/mem/root")).await.unwrap(),
            Some(EntryKind::Dir)
        );
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_io() {
        let (fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();
        ctx.cancel_token.cancel();
        let before = fs.len();

        assert!(store
            .put(&ctx, "k", &mut &b"x"[..])
            .await
            .unwrap_err()
            .is_cancelled());
        assert!(store.get(&ctx, "k").await.err().unwrap().is_cancelled());
        assert!(store.delete(&ctx, "k").await.unwrap_err().is_cancelled());
        assert_eq!(fs.len(), before);
    }

    #[tokio::test]
    async fn stats_track_successful_operations() {
        let (_fs, store) = mem_store(LocalPolicy::default()).await;
        let ctx = StoreCtx::background();

        store.put(&ctx, "s", &mut &b"12345"[..]).await.unwrap();
        let _ = store.get(&ctx, "s").await.unwrap();
        let _ = store.get(&ctx, "missing").await;
        store.delete(&ctx, "s").await.unwrap();

        let snapshot = store.stats().snapshot();
        assert_eq!(snapshot.puts, 1);
        assert_eq!(snapshot.gets, 1);
        assert_eq!(snapshot.deletes, 1);
        assert_eq!(snapshot.bytes_written, 5);
    }
}
