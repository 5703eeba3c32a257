//! Narrow filesystem capability used by [`super::LocalStorage`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::r#trait::ObjectReader;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// The filesystem primitives the local backend needs.
///
/// Implementations follow symlinks in `stat` and `canonicalize`, report a
/// missing path from `stat` as `Ok(None)`, and make `write_new` replace any
/// file at the target in one step.
#[async_trait]
pub trait FsOps: Send + Sync + fmt::Debug {
    async fn stat(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn write_new(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()>;

    async fn open(&self, path: &Path) -> io::Result<ObjectReader>;

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Host filesystem through `tokio::fs`, which runs each call on the
/// blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFs;

#[async_trait]
impl FsOps for OsFs {
    async fn stat(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Dir)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(path).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }

    async fn write_new(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        let tmp = PartialFile::beside(path)?;
        write_then_rename(tmp.path(), path, data, mode).await?;
        tmp.persisted();
        Ok(())
    }

    async fn open(&self, path: &Path) -> io::Result<ObjectReader> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}

/// Hidden sibling holding an object while it is being written.
///
/// The name only depends on a fresh uuid, so it fits wherever the final
/// name fits. Unless [`PartialFile::persisted`] is called, the file is
/// removed on drop, including when the owning future is dropped mid-write.
#[derive(Debug)]
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn beside(target: &Path) -> io::Result<Self> {
        let dir = target.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "object path has no parent")
        })?;
        Ok(Self {
            path: dir.join(format!(".{}.partial", Uuid::new_v4().simple())),
            armed: true,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The temp file has been renamed onto the target.
    fn persisted(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(mode);

    let mut file = options.open(tmp).await?;
    file.write_all(data).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .await?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn write_new_replaces_and_leaves_no_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("obj");

        OsFs.write_new(&path, b"first version", 0o644).await.unwrap();
        OsFs.write_new(&path, b"second", 0o644).await.unwrap();

        let mut reader = OsFs.open(&path).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"second");

        assert_eq!(dir_names(tmp.path()), vec!["obj".to_string()]);
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_new_accepts_names_near_the_host_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let name = "n".repeat(240);
        let path = tmp.path().join(&name);

        OsFs.write_new(&path, b"hello", 0o644).await.unwrap();
        OsFs.write_new(&path, b"again", 0o644).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"again");
        assert_eq!(dir_names(tmp.path()), vec![name]);
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("occupied");
        std::fs::create_dir_all(target.join("child")).unwrap();

        assert!(OsFs.write_new(&target, b"x", 0o644).await.is_err());
        assert_eq!(dir_names(tmp.path()), vec!["occupied".to_string()]);
    }

    #[test]
    fn abandoned_partial_file_is_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let partial = PartialFile::beside(&tmp.path().join("obj")).unwrap();
        let name = partial.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with('.') && name.ends_with(".partial"));

        std::fs::write(partial.path(), b"half").unwrap();
        drop(partial);
        assert!(dir_names(tmp.path()).is_empty());

        let kept = PartialFile::beside(&tmp.path().join("obj")).unwrap();
        let kept_path = kept.path().to_path_buf();
        std::fs::write(&kept_path, b"done").unwrap();
        kept.persisted();
        assert!(kept_path.exists());
    }

    #[tokio::test]
    async fn stat_reports_missing_paths_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(OsFs.stat(tmp.path()).await.unwrap(), Some(EntryKind::Dir));
        assert_eq!(OsFs.stat(&tmp.path().join("nope")).await.unwrap(), None);

        std::fs::write(tmp.path().join("file"), b"x").unwrap();
        assert_eq!(
            OsFs.stat(&tmp.path().join("file")).await.unwrap(),
            Some(EntryKind::File)
        );
        assert_eq!(
            OsFs.stat(&tmp.path().join("file/below")).await.unwrap(),
            None
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_new_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("moded");
        OsFs.write_new(&path, b"x", 0o640).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
