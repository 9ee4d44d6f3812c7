//! Root-confined filesystem wrapper.
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use super::{Filesystem, Metadata, ReadSeek};

/// Join `path` under `root`, resolving `.` and `..` lexically.
///
/// Absolute paths are re-rooted (`/etc/hosts` becomes `<root>/etc/hosts`).
/// A `..` that would climb above `root` is rejected with
/// [`io::ErrorKind::PermissionDenied`].
///
/// # Errors
///
/// Returns an error if `path` escapes `root`.
pub fn confine(root: &Path, path: &Path) -> io::Result<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("{} escapes {}", path.display(), root.display()),
                    ));
                }
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    let mut confined = root.to_path_buf();
    confined.extend(parts);
    Ok(confined)
}

/// [`Filesystem`] that confines every path under a root directory before
/// delegating to another implementation.
///
/// Any implementation can be wrapped, which lets a caller sandbox a whole run
/// (`prepare --root`, tests against a temp dir) without the mapping logic
/// knowing about it.
#[derive(Debug, Clone)]
pub struct RootedFs<F> {
    inner: F,
    root: PathBuf,
}

impl<F: Filesystem> RootedFs<F> {
    /// Wrap `inner`, confining all paths under `root`.
    pub fn new(inner: F, root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            root: root.into(),
        }
    }

    /// The confining root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Translate `path` into the path handed to the wrapped filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` escapes the root.
    pub fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        confine(&self.root, path)
    }
}

impl<F: Filesystem> Filesystem for RootedFs<F> {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        self.inner.metadata(&self.real_path(path)?)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        self.inner.open_read(&self.real_path(path)?)
    }

    fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>> {
        self.inner.open_write(&self.real_path(path)?, mode)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.create_dir_all(&self.real_path(path)?, mode)
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        self.inner.chown(&self.real_path(path)?, uid, gid)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fs::MemFs;

    #[test]
    fn confine_reroots_absolute_paths() {
        let p = confine(Path::new("/srv/pi"), Path::new("/boot/config.txt")).unwrap();
        assert_eq!(p, PathBuf::from("/srv/pi/boot/config.txt"));
    }

    #[test]
    fn confine_allows_parent_within_root() {
        let p = confine(Path::new("/srv/pi"), Path::new("boot/../etc/hosts")).unwrap();
        assert_eq!(p, PathBuf::from("/srv/pi/etc/hosts"));
    }

    #[test]
    fn confine_rejects_escape() {
        let err = confine(Path::new("/srv/pi"), Path::new("../../etc/shadow")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn confine_of_root_is_root() {
        let p = confine(Path::new("/srv/pi"), Path::new("/")).unwrap();
        assert_eq!(p, PathBuf::from("/srv/pi"));
    }

    #[test]
    fn writes_land_under_root() {
        let mem = MemFs::new();
        let rooted = RootedFs::new(mem.clone(), "/sandbox");
        rooted.create_dir_all(Path::new("/etc"), 0o755).unwrap();
        {
            let mut w = rooted.open_write(Path::new("/etc/hostname"), 0o644).unwrap();
            w.write_all(b"raspberrypi").unwrap();
        }

        assert_eq!(mem.read_file("/sandbox/etc/hostname").unwrap(), b"raspberrypi");
        assert!(mem.metadata(Path::new("/etc/hostname")).is_err());
        assert_eq!(
            rooted.metadata(Path::new("/etc/hostname")).unwrap().len,
            11
        );
    }

    #[test]
    fn escaping_paths_never_reach_inner() {
        let mem = MemFs::new();
        mem.write_file("/etc/shadow", b"root:*", 0o600).unwrap();
        let rooted = RootedFs::new(mem, "/sandbox");
        let err = rooted
            .open_read(Path::new("../etc/shadow"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn wraps_trait_objects() {
        let inner: Box<dyn Filesystem> = Box::new(MemFs::new());
        let rooted = RootedFs::new(inner, "/r");
        rooted.create_dir_all(Path::new("a/b"), 0o750).unwrap();
        assert_eq!(rooted.metadata(Path::new("/a/b")).unwrap().mode, 0o750);
    }
}
