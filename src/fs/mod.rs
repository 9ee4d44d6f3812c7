//! Filesystem capability used by every provisioning operation.
//!
//! Nothing in the engine touches the host OS directly: mappings, mappers,
//! and recipe bakes all receive a `&dyn Filesystem` from their caller.
//! Production code passes [`OsFs`] (optionally confined by [`RootedFs`]);
//! tests pass [`MemFs`].
mod memory;
mod os;
mod rooted;

use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

pub use memory::MemFs;
pub use os::OsFs;
pub use rooted::{RootedFs, confine};

/// Permission bits considered by the engine (`rwx` for all classes plus
/// setuid, setgid and sticky).
pub const PERMISSION_BITS: u32 = 0o7777;

/// A readable, seekable handle.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// The subset of file metadata the engine relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Permission bits, masked with [`PERMISSION_BITS`].
    pub mode: u32,
    /// Size in bytes (zero for directories).
    pub len: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// File operations needed to converge a destination tree.
pub trait Filesystem {
    /// Return metadata for `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when `path` does not exist, or any
    /// other I/O error raised while probing it.
    fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    /// Open `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is missing, is a directory, or cannot be
    /// opened.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>>;

    /// Open `path` for writing, creating it if needed and truncating it
    /// otherwise. The file ends up with permission bits `mode` either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory is missing or the file cannot
    /// be created or opened.
    fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>>;

    /// Create `path` and all missing ancestors with permission bits `mode`.
    /// Succeeds without changes when the directory already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a component exists but is not a directory, or a
    /// directory cannot be created.
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Change the numeric owner and group of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if ownership cannot be changed.
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()>;
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        (**self).metadata(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        (**self).open_read(path)
    }

    fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>> {
        (**self).open_write(path, mode)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        (**self).create_dir_all(path, mode)
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        (**self).chown(path, uid, gid)
    }
}

impl<F: Filesystem + ?Sized> Filesystem for Box<F> {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        (**self).metadata(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        (**self).open_read(path)
    }

    fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>> {
        (**self).open_write(path, mode)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        (**self).create_dir_all(path, mode)
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        (**self).chown(path, uid, gid)
    }
}

/// Read the whole of `path` through `fs`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_all(fs: &dyn Filesystem, path: &Path) -> io::Result<Vec<u8>> {
    let mut reader = fs.open_read(path)?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Resolve `.` and `..` lexically, producing an absolute path.
///
/// `..` at the root stays at the root, as it does for the kernel.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

/// Filesystem doubles shared by unit tests across the crate.
#[cfg(test)]
pub mod test_helpers {
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, PoisonError};

    use super::{Filesystem, MemFs, Metadata, ReadSeek, normalize};

    /// Filesystem operation selector for [`RecordingFs`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        /// [`Filesystem::metadata`].
        Metadata,
        /// [`Filesystem::open_read`].
        OpenRead,
        /// [`Filesystem::open_write`].
        OpenWrite,
        /// Writes through a handle returned by `open_write`. The open itself
        /// succeeds (and truncates); every write then fails.
        Stream,
        /// [`Filesystem::create_dir_all`].
        CreateDir,
        /// [`Filesystem::chown`].
        Chown,
    }

    /// Wraps a [`MemFs`], recording every call and ownership change, and
    /// optionally failing one operation on one path.
    #[derive(Debug)]
    pub struct RecordingFs {
        inner: MemFs,
        fault: Option<(Op, PathBuf, io::ErrorKind)>,
        calls: Mutex<Vec<(Op, PathBuf)>>,
        chowns: Mutex<Vec<(PathBuf, u32, u32)>>,
    }

    impl RecordingFs {
        /// Wrap `inner` with no injected faults.
        pub fn new(inner: MemFs) -> Self {
            Self {
                inner,
                fault: None,
                calls: Mutex::new(Vec::new()),
                chowns: Mutex::new(Vec::new()),
            }
        }

        /// Fail `op` on `path` with an error of `kind`.
        #[must_use]
        pub fn failing(mut self, op: Op, path: impl AsRef<Path>, kind: io::ErrorKind) -> Self {
            self.fault = Some((op, normalize(path.as_ref()), kind));
            self
        }

        /// Number of recorded calls to `op`.
        pub fn calls(&self, op: Op) -> usize {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|(o, _)| *o == op)
                .count()
        }

        /// Successful ownership changes, in order.
        pub fn chowns(&self) -> Vec<(PathBuf, u32, u32)> {
            self.chowns
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn record(&self, op: Op, path: &Path) -> io::Result<()> {
            let path = normalize(path);
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((op, path.clone()));
            match &self.fault {
                Some((o, p, kind)) if *o == op && *p == path => {
                    Err(io::Error::new(*kind, format!("injected {op:?} failure")))
                }
                _ => Ok(()),
            }
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("injected Stream failure"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Filesystem for RecordingFs {
        fn metadata(&self, path: &Path) -> io::Result<Metadata> {
            self.record(Op::Metadata, path)?;
            self.inner.metadata(path)
        }

        fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
            self.record(Op::OpenRead, path)?;
            self.inner.open_read(path)
        }

        fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>> {
            self.record(Op::OpenWrite, path)?;
            let writer = self.inner.open_write(path, mode)?;
            if self.record(Op::Stream, path).is_err() {
                return Ok(Box::new(BrokenWriter));
            }
            Ok(writer)
        }

        fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
            self.record(Op::CreateDir, path)?;
            self.inner.create_dir_all(path, mode)
        }

        fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
            self.record(Op::Chown, path)?;
            self.inner.chown(path, uid, gid)?;
            self.chowns
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((normalize(path), uid, gid));
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/b")), PathBuf::from("/a/b"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
    }

    #[test]
    fn read_all_through_reference() {
        let fs = MemFs::new();
        fs.write_file("/boot/cmdline.txt", b"console=serial0", 0o644)
            .unwrap();
        let by_ref: &MemFs = &fs;
        let data = read_all(&by_ref, Path::new("/boot/cmdline.txt")).unwrap();
        assert_eq!(data, b"console=serial0");
    }

    #[test]
    fn boxed_filesystem_delegates() {
        let fs: Box<dyn Filesystem> = Box::new(MemFs::new());
        fs.create_dir_all(Path::new("/etc"), 0o755).unwrap();
        assert!(fs.metadata(Path::new("/etc")).unwrap().is_dir);
    }
}
