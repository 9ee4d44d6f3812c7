//! Host filesystem backend.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::{Filesystem, Metadata, PERMISSION_BITS, ReadSeek};

/// [`Filesystem`] backed directly by the host OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    /// Create a host filesystem handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl From<&fs::Metadata> for Metadata {
    fn from(meta: &fs::Metadata) -> Self {
        Self {
            mode: permission_bits(meta),
            len: meta.len(),
            is_dir: meta.is_dir(),
        }
    }
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt as _;
    meta.permissions().mode() & PERMISSION_BITS
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    let mode = if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    mode & PERMISSION_BITS
}

impl Filesystem for OsFs {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        fs::metadata(path).map(|m| Metadata::from(&m))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let file = File::open(path)?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write>> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt as _;
            options.mode(mode);
        }
        let file = options.open(path)?;
        // The creation mode is filtered by the umask and ignored for files
        // that already exist, so set it explicitly.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            file.set_permissions(fs::Permissions::from_mode(mode & PERMISSION_BITS))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        Ok(Box::new(file))
    }

    #[cfg(unix)]
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::{DirBuilderExt as _, PermissionsExt as _};

        // Deepest first, so a parent without search permission is set last.
        let created: Vec<&Path> = path
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && fs::symlink_metadata(p).is_err())
            .collect();
        fs::DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)?;
        // The builder's mode is filtered by the umask.
        for dir in created {
            fs::set_permissions(dir, fs::Permissions::from_mode(mode & PERMISSION_BITS))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn create_dir_all(&self, path: &Path, _mode: u32) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    #[cfg(unix)]
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> io::Result<()> {
        std::os::unix::fs::chown(path, Some(uid), Some(gid))
    }

    #[cfg(not(unix))]
    fn chown(&self, path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("chown not supported on this platform: {}", path.display()),
        ))
    }
}
