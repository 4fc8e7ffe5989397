//! Filesystem capability used by stores.
//!
//! Stores never touch `std::fs` directly; they go through [`FileSystem`] so an
//! in-memory [`MemoryFileSystem`] can stand in during tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

pub trait FileSystem: Send + Sync {
    /// Create `path` and any missing parents. An existing directory is not an error.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create or truncate the file at `path`. The parent directory must exist.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn entry_kind(&self, path: &Path) -> Option<EntryKind>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        let meta = fs::metadata(path).ok()?;
        if meta.is_dir() {
            Some(EntryKind::Directory)
        } else {
            Some(EntryKind::File)
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
}

/// In-memory filesystem rooted at `/`.
///
/// Paths are normalized lexically (`.` dropped, `..` pops), so `a/./b` and
/// `a/b` name the same entry.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Directory);
        Self {
            nodes: Mutex::new(nodes),
        }
    }

    /// Number of regular files currently stored.
    pub fn file_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|n| matches!(n, Node::File(_)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A panic while holding the lock leaves the map consistent; keep going.
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for c in path.components() {
        match c {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}

fn not_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("not a directory: {}", path.display()),
    )
}

impl FileSystem for MemoryFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();

        let mut chain: Vec<&Path> = path.ancestors().collect();
        chain.reverse();
        for dir in &chain {
            if let Some(Node::File(_)) = nodes.get(*dir) {
                return Err(not_a_directory(dir));
            }
        }
        for dir in chain {
            nodes.entry(dir.to_path_buf()).or_insert(Node::Directory);
        }
        Ok(())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();

        let parent = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cannot write to root"))?;
        match nodes.get(parent) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => return Err(not_a_directory(parent)),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent directory missing: {}", parent.display()),
                ))
            }
        }
        if let Some(Node::Directory) = nodes.get(&path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            ));
        }

        nodes.insert(path, Node::File(contents.to_vec()));
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize(path);
        let nodes = self.lock();
        match nodes.get(&path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Directory) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )),
        }
    }

    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        let path = normalize(path);
        let nodes = self.lock();
        match nodes.get(&path)? {
            Node::File(_) => Some(EntryKind::File),
            Node::Directory => Some(EntryKind::Directory),
        }
    }
}
