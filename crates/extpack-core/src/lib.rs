#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod archive;
mod assemble;
mod collect;
mod config;
mod error;
mod schedule;

pub use archive::TreeArchiver;
pub use assemble::{ProjectAssembler, ProjectSpec, APPNAME_KEY, APPVERSION_KEY};
pub use collect::{PackageCollector, EXPORT_PATHS_SUFFIX, HOME_SUFFIX, NATIVE_VERSION_SUFFIX};
pub use config::{PackConfig, DEFAULT_IGNORE, DEFAULT_OUTPUT_DIR};
pub use error::{PackError, Result};
pub use schedule::{ArchiveScheduler, PackReport, PackedArchive};

pub use extpack_domain::{CacheFile, InfoError, MemoryInfos, ProjectInfos, Unit};
