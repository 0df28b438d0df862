//! Output location resolution.
//!
//! A job writes either to an explicit path or to a generated file name under
//! a temporary directory. Resolution happens before any reader stream or
//! writer is opened, so an unusable destination fails the job early.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ReframeError;
use crate::settings::ContainerFormat;

/// Where a transcode job writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocation {
    /// Write to exactly this path.
    Explicit(PathBuf),
    /// Write to `<uuid>.<ext>` inside `directory`, or inside the system
    /// temporary directory when `None`.
    Temporary {
        /// Directory for the generated file.
        directory: Option<PathBuf>,
    },
}

impl Default for OutputLocation {
    fn default() -> Self {
        OutputLocation::Temporary { directory: None }
    }
}

impl OutputLocation {
    /// Resolve to a concrete, writable file path.
    ///
    /// An existing explicit file is not touched here; the writer replaces it
    /// when it creates the destination. Temporary directories are created if
    /// missing.
    ///
    /// # Errors
    ///
    /// - [`ReframeError::InvalidOutputDirectory`] if the parent directory is
    ///   missing, not a directory, or read-only.
    /// - [`ReframeError::OutputExists`] if the explicit file exists and
    ///   `overwrite` is `false`.
    pub fn resolve(
        &self,
        container: ContainerFormat,
        overwrite: bool,
    ) -> Result<PathBuf, ReframeError> {
        match self {
            OutputLocation::Explicit(path) => resolve_explicit(path, overwrite),
            OutputLocation::Temporary { directory } => {
                let directory = directory.clone().unwrap_or_else(std::env::temp_dir);
                fs::create_dir_all(&directory).map_err(|error| {
                    ReframeError::InvalidOutputDirectory {
                        path: directory.clone(),
                        reason: error.to_string(),
                    }
                })?;
                ensure_writable_directory(&directory)?;
                Ok(directory.join(format!("{}.{}", Uuid::new_v4(), container.extension())))
            }
        }
    }
}

fn resolve_explicit(path: &Path, overwrite: bool) -> Result<PathBuf, ReframeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_writable_directory(parent)?;

    if path.is_dir() {
        return Err(ReframeError::InvalidOutputDirectory {
            path: path.to_path_buf(),
            reason: "output path is a directory".to_string(),
        });
    }

    if path.exists() {
        if !overwrite {
            return Err(ReframeError::OutputExists(path.to_path_buf()));
        }
        log::info!("Existing output {} will be replaced", path.display());
    }

    Ok(path.to_path_buf())
}

/// Whether both paths name the same existing file.
pub(crate) fn is_same_file(first: &Path, second: &Path) -> bool {
    match (fs::canonicalize(first), fs::canonicalize(second)) {
        (Ok(first), Ok(second)) => first == second,
        _ => false,
    }
}

fn ensure_writable_directory(directory: &Path) -> Result<(), ReframeError> {
    let metadata = fs::metadata(directory).map_err(|error| ReframeError::InvalidOutputDirectory {
        path: directory.to_path_buf(),
        reason: error.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(ReframeError::InvalidOutputDirectory {
            path: directory.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    if metadata.permissions().readonly() {
        return Err(ReframeError::InvalidOutputDirectory {
            path: directory.to_path_buf(),
            reason: "directory is read-only".to_string(),
        });
    }

    Ok(())
}
