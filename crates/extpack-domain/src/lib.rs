#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod infos;
pub mod list;
pub mod paths;
pub mod unit;

pub use infos::{CacheFile, InfoError, MemoryInfos, ProjectInfos, SITEROOT_KEY, VARIANT_KEY};
pub use list::decode_path_list;
pub use paths::{longest_common_prefix, normalize_lexically, relativize, relativize_path};
pub use unit::{archive_file_name, normalize_version, Unit, ARCHIVE_EXTENSION};
