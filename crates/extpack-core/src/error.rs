use std::io;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use extpack_domain::InfoError;

use crate::schedule::PackedArchive;

pub type Result<T, E = PackError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error(transparent)]
    Metadata(#[from] InfoError),
    #[error("problem collecting packages: {}", units.join(", "))]
    Collection { units: Vec<String> },
    #[error("{action} [{path}]: {source}")]
    Filesystem {
        action: &'static str,
        path: Utf8PathBuf,
        source: io::Error,
    },
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    /// A walked path escaped the directory being archived.
    #[error("{0}")]
    Structural(String),
    #[error("failed to extract [{archive}]: {reason}")]
    Extract {
        archive: Utf8PathBuf,
        reason: String,
    },
    #[error("problem creating a pack: {}", failed.join(", "))]
    Scheduler {
        failed: Vec<String>,
        archives: Vec<PackedArchive>,
    },
    #[error("no packages to assemble into a project archive")]
    EmptyProject,
}

pub(crate) fn fs_error<'a>(
    action: &'static str,
    path: &'a Utf8Path,
) -> impl FnOnce(io::Error) -> PackError + 'a {
    move |source| PackError::Filesystem {
        action,
        path: path.to_owned(),
        source,
    }
}

/// Like [`fs_error`] for walked paths, which may not be valid UTF-8.
pub(crate) fn lossy_fs_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> PackError + 'a {
    move |source| PackError::Filesystem {
        action,
        path: lossy_utf8(path),
        source,
    }
}

pub(crate) fn lossy_utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.to_string_lossy().into_owned())
}
