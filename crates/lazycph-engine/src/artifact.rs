//! Self-cleaning temporary executable paths.
//!
//! The compiler creates the file; `TempArtifact` only owns the name and
//! removes whatever ends up there when it goes out of scope.

use std::io;
use std::path::{Path, PathBuf};

/// Namespace tag so our files are recognisable in a shared temp dir.
pub const ARTIFACT_PREFIX: &str = "lazycph-";

/// Length of the random part of the file name.
pub const RANDOM_SUFFIX_LEN: usize = 12;

/// RAII guard over one temp executable path. Dropping it calls [`release`].
///
/// [`release`]: TempArtifact::release
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    /// New unique path under the system temp dir. Nothing is created on disk.
    pub fn acquire() -> Self {
        Self::acquire_in(&std::env::temp_dir())
    }

    /// New unique path under `dir`.
    pub fn acquire_in(dir: &Path) -> Self {
        let path = dir.join(file_name());
        tracing::debug!(path = %path.display(), "Acquired temp artifact");
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the artifact if it exists. A missing file is fine; repeated
    /// calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temp artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temp artifact"
            ),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        self.release();
    }
}

fn file_name() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    let name = format!("{}{}", ARTIFACT_PREFIX, &random[..RANDOM_SUFFIX_LEN]);
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name
    }
}
