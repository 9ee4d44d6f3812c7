// Shared helpers for integration tests.
//
// Provides a temporary directory standing in for a boot partition or a
// recipe tree, so each integration test works on the real filesystem in
// isolation.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// An isolated directory tree backed by a [`tempfile::TempDir`].
pub struct Workspace {
    root: tempfile::TempDir,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Absolute path of the workspace root.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Absolute path of `rel` inside the workspace.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content).expect("write file");
        self
    }

    /// Read `rel` as UTF-8.
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Whether `rel` exists.
    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Permission bits of `rel`.
    #[cfg(unix)]
    pub fn mode(&self, rel: &str) -> u32 {
        use std::os::unix::fs::PermissionsExt as _;
        fs::metadata(self.path(rel))
            .expect("stat file")
            .permissions()
            .mode()
            & 0o7777
    }

    /// Owner and group of the workspace root, i.e. of the test process.
    /// Chowning to these always succeeds without privileges.
    #[cfg(unix)]
    pub fn owner(&self) -> (u32, u32) {
        use std::os::unix::fs::MetadataExt as _;
        let meta = fs::metadata(self.root()).expect("stat root");
        (meta.uid(), meta.gid())
    }
}
