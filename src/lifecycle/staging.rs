//! Per-fixture certificate staging directories.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use uuid::Uuid;

use crate::error::{DindError, FilesystemError};

const CERTS_DIR: &str = "certs";
const CLIENT_DIR: &str = "client";

/// Host directory the nested daemon writes its TLS material into.
///
/// Laid out as `<base>/<uuid>/certs`. The crate only creates and deletes the
/// directory; its contents come from the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDirectory {
    base: Utf8PathBuf,
    instance: String,
}

impl StagingDirectory {
    /// Pick a fresh, unique staging location under `base`.
    #[must_use]
    pub fn generate(base: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base: base.into(),
            instance: Uuid::new_v4().to_string(),
        }
    }

    /// Return the per-instance root, `<base>/<uuid>`.
    #[must_use]
    pub fn root(&self) -> Utf8PathBuf {
        self.base.join(&self.instance)
    }

    /// Return the directory mounted into the container, `<base>/<uuid>/certs`.
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.root().join(CERTS_DIR)
    }

    /// Return where the daemon places client credentials.
    #[must_use]
    pub fn client_path(&self) -> Utf8PathBuf {
        self.path().join(CLIENT_DIR)
    }

    /// Create the staging directory and any missing parents below `base`.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError::StagingFailed` when `base` cannot be opened
    /// or the directory cannot be created.
    pub fn create(&self) -> Result<(), DindError> {
        let staging_failed = |error: &io::Error| {
            DindError::from(FilesystemError::StagingFailed {
                path: self.path().into_std_path_buf(),
                message: error.to_string(),
            })
        };

        let base_dir =
            Dir::open_ambient_dir(&self.base, ambient_authority()).map_err(|e| staging_failed(&e))?;
        let relative = Utf8Path::new(&self.instance).join(CERTS_DIR);
        base_dir
            .create_dir_all(&relative)
            .map_err(|e| staging_failed(&e))
    }

    /// Delete the per-instance root and everything below it.
    ///
    /// A root that does not exist counts as removed.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError::IoError` when deletion fails.
    pub fn remove(&self) -> Result<(), DindError> {
        let io_failed = |error: &io::Error| {
            DindError::from(FilesystemError::IoError {
                path: self.root().into_std_path_buf(),
                message: error.to_string(),
            })
        };

        let base_dir = match Dir::open_ambient_dir(&self.base, ambient_authority()) {
            Ok(dir) => dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(io_failed(&error)),
        };

        match base_dir.remove_dir_all(&self.instance) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_failed(&error)),
        }
    }
}
