//! Top-level subcommand orchestration.
pub mod bake;
pub mod prepare;
pub mod vars;
pub mod version;

use std::path::Path;

use crate::fs::{Filesystem, OsFs, RootedFs};

/// Host filesystem, confined under `root` when one is given.
pub(crate) fn host_filesystem(root: Option<&Path>) -> Box<dyn Filesystem> {
    match root {
        Some(root) => {
            tracing::debug!("confining all paths under {}", root.display());
            Box::new(RootedFs::new(OsFs::new(), root))
        }
        None => Box::new(OsFs::new()),
    }
}
