//! In-memory filesystem used by tests.
use std::collections::BTreeMap;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Filesystem, Metadata, PERMISSION_BITS, ReadSeek, normalize};

#[derive(Debug, Clone)]
enum Node {
    Dir { mode: u32 },
    File { mode: u32, data: Vec<u8> },
}

type Tree = BTreeMap<PathBuf, Node>;

/// [`Filesystem`] backed by an in-process tree.
///
/// Paths are resolved lexically against `/`. Clones share the same tree, so
/// a test can keep one handle for inspection while the engine uses another.
///
/// Ownership is not tracked: [`Filesystem::chown`] always succeeds without
/// recording anything.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    tree: Arc<Mutex<Tree>>,
}

impl MemFs {
    /// Create an empty filesystem containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `contents` to `path` with `mode`, creating parent directories
    /// with mode `0o755`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent component is a file or `path` is a
    /// directory.
    pub fn write_file(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<[u8]>,
        mode: u32,
    ) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent, 0o755)?;
        }
        let mut w = self.open_write(path, mode)?;
        w.write_all(contents.as_ref())
    }

    /// Return the contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is missing or is a directory.
    pub fn read_file(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        let path = normalize(path.as_ref());
        match self.lock().get(&path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(is_a_directory(&path)),
            None => Err(not_found(&path)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

fn is_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::IsADirectory,
        format!("{}: is a directory", path.display()),
    )
}

fn not_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotADirectory,
        format!("{}: not a directory", path.display()),
    )
}

fn lookup(tree: &Tree, path: &Path) -> Option<Node> {
    if path == Path::new("/") {
        return Some(Node::Dir { mode: 0o755 });
    }
    tree.get(path).cloned()
}

impl Filesystem for MemFs {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        let path = normalize(path);
        match lookup(&self.lock(), &path) {
            Some(Node::Dir { mode }) => Ok(Metadata {
                mode,
                len: 0,
                is_dir: true,
            }),
            Some(Node::File { mode, data }) => Ok(Metadata {
                mode,
                len: data.len() as u64,
                is_dir: false,
            }),
            None => Err(not_found(&path)),
        }
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let data = self.read_file(path)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>> {
        let path = normalize(path);
        let mut tree = self.lock();
        if let Some(parent) = path.parent() {
            match lookup(&tree, parent) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(parent)),
                None => return Err(not_found(parent)),
            }
        }
        if let Some(Node::Dir { .. }) = tree.get(&path) {
            return Err(is_a_directory(&path));
        }
        tree.insert(
            path.clone(),
            Node::File {
                mode: mode & PERMISSION_BITS,
                data: Vec::new(),
            },
        );
        Ok(Box::new(MemWriter {
            tree: Arc::clone(&self.tree),
            path,
        }))
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = normalize(path);
        let mut tree = self.lock();
        let mut current = PathBuf::from("/");
        for part in path.iter().skip(1) {
            current.push(part);
            match tree.get(&current) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(&current)),
                None => {
                    tree.insert(
                        current.clone(),
                        Node::Dir {
                            mode: mode & PERMISSION_BITS,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn chown(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        Ok(())
    }
}

/// Write handle appending straight into the shared tree.
#[derive(Debug)]
struct MemWriter {
    tree: Arc<Mutex<Tree>>,
    path: PathBuf,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        match tree.get_mut(&self.path) {
            Some(Node::File { data, .. }) => {
                data.extend_from_slice(buf);
                Ok(buf.len())
            }
            Some(Node::Dir { .. }) => Err(is_a_directory(&self.path)),
            None => Err(not_found(&self.path)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
