use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;

use super::ops::{EntryKind, FsOps};
use crate::r#trait::ObjectReader;

#[derive(Clone, Debug)]
enum MemNode {
    Dir { mode: u32 },
    File { data: Vec<u8>, mode: u32 },
}

impl MemNode {
    fn kind(&self) -> EntryKind {
        match self {
            MemNode::Dir { .. } => EntryKind::Dir,
            MemNode::File { .. } => EntryKind::File,
        }
    }
}

/// In-memory filesystem for exercising key mapping without touching disk.
///
/// Paths are compared after lexical cleaning; there are no symlinks, so
/// `canonicalize` only cleans.
#[derive(Debug, Default)]
pub struct MemFs {
    nodes: RwLock<BTreeMap<PathBuf, MemNode>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the file at `path`, if one exists.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        match self.nodes.read().get(&path.clean()) {
            Some(MemNode::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn mode(&self, path: &Path) -> Option<u32> {
        self.nodes.read().get(&path.clean()).map(|node| match node {
            MemNode::Dir { mode } | MemNode::File { mode, .. } => *mode,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

#[async_trait]
impl FsOps for MemFs {
    async fn stat(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        Ok(self.nodes.read().get(&path.clean()).map(MemNode::kind))
    }

    async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = path.clean();
        let mut nodes = self.nodes.write();
        let mut chain: Vec<&Path> = path
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        chain.reverse();
        for dir in chain {
            match nodes.get(dir) {
                Some(MemNode::Dir { .. }) => {}
                Some(MemNode::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} is a file, not a directory", dir.display()),
                    ));
                }
                None => {
                    nodes.insert(dir.to_path_buf(), MemNode::Dir { mode });
                }
            }
        }
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = path.clean();
        let mut nodes = self.nodes.write();
        match nodes.get(&path) {
            Some(MemNode::File { .. }) => {
                nodes.remove(&path);
                Ok(())
            }
            Some(MemNode::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(&path)),
        }
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = path.clean();
        let mut nodes = self.nodes.write();
        match nodes.get(&path) {
            Some(MemNode::Dir { .. }) => {
                nodes.retain(|p, _| !p.starts_with(&path));
                Ok(())
            }
            Some(MemNode::File { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", path.display()),
            )),
            None => Err(not_found(&path)),
        }
    }

    async fn write_new(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        let path = path.clean();
        let mut nodes = self.nodes.write();
        let parent_is_dir = path
            .parent()
            .map(|parent| matches!(nodes.get(parent), Some(MemNode::Dir { .. })))
            .unwrap_or(false);
        if !parent_is_dir {
            return Err(not_found(&path));
        }
        if let Some(MemNode::Dir { .. }) = nodes.get(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", path.display()),
            ));
        }
        nodes.insert(
            path,
            MemNode::File {
                data: data.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    async fn open(&self, path: &Path) -> io::Result<ObjectReader> {
        let path = path.clean();
        match self.nodes.read().get(&path) {
            Some(MemNode::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(MemNode::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(&path)),
        }
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let path = path.clean();
        if self.nodes.read().contains_key(&path) {
            Ok(path)
        } else {
            Err(not_found(&path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_dir_all_builds_every_ancestor() {
        let fs = MemFs::new();
        assert!(fs.is_empty());
        fs.create_dir_all(Path::new("/mem/root/a"), 0o755)
            .await
            .unwrap();
        for dir in ["/", "/mem", "/mem/root", "/mem/root/a"] {
            assert_eq!(
                fs.stat(Path::new(dir)).await.unwrap(),
                Some(EntryKind::Dir),
                "{dir}"
            );
        }
        assert_eq!(fs.mode(Path::new("/mem/root/a")), Some(0o755));
    }

    #[tokio::test]
    async fn create_dir_all_refuses_to_cross_a_file() {
        let fs = MemFs::new();
        fs.create_dir_all(Path::new("/r"), 0o777).await.unwrap();
        fs.write_new(Path::new("/r/f"), b"x", 0o644).await.unwrap();
        let err = fs
            .create_dir_all(Path::new("/r/f/sub"), 0o777)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn write_new_requires_parent_directory() {
        let fs = MemFs::new();
        let err = fs
            .write_new(Path::new("/missing/f"), b"x", 0o644)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_dir_all_drops_subtree_only() {
        let fs = MemFs::new();
        fs.create_dir_all(Path::new("/r/a/b"), 0o777).await.unwrap();
        fs.create_dir_all(Path::new("/r/ab"), 0o777).await.unwrap();
        fs.write_new(Path::new("/r/a/b/f"), b"x", 0o644)
            .await
            .unwrap();

        fs.remove_dir_all(Path::new("/r/a")).await.unwrap();

        assert_eq!(fs.stat(Path::new("/r/a")).await.unwrap(), None);
        assert_eq!(fs.stat(Path::new("/r/a/b/f")).await.unwrap(), None);
        assert_eq!(
            fs.stat(Path::new("/r/ab")).await.unwrap(),
            Some(EntryKind::Dir)
        );
    }
}
