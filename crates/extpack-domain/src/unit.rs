use camino::Utf8PathBuf;
use serde::Serialize;

use crate::paths::longest_common_prefix;

pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// A package whose exported directories get packed into one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub name: String,
    pub version: String,
    /// Install root of the unit; archive member names are computed relative to it.
    pub root: Utf8PathBuf,
    pub variant: String,
    pub siteroot: Utf8PathBuf,
    /// Exported directories, all known to exist when the unit was collected.
    pub dirs: Vec<Utf8PathBuf>,
}

impl Unit {
    /// Top-level directory of every member in the unit's archive: `<name>-<version>`.
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn archive_file_name(&self) -> String {
        archive_file_name(&self.name, &self.version, &self.variant)
    }

    /// Position of the unit's root below the siteroot, without a leading separator.
    pub fn home_dir(&self) -> &str {
        let common = longest_common_prefix(self.root.as_str(), self.siteroot.as_str());
        self.root.as_str()[common.len()..].trim_start_matches('/')
    }
}

pub fn archive_file_name(name: &str, version: &str, variant: &str) -> String {
    format!("{name}-{version}-{variant}.{ARCHIVE_EXTENSION}")
}

/// Drops a `<name>-` and then a `<name>_` lead from a native version string.
///
/// Each form is removed at most once, so `foo-foo-1.0` keeps its second `foo-`.
pub fn normalize_version(name: &str, raw: &str) -> String {
    let mut version = raw;
    if let Some(rest) = version.strip_prefix(&format!("{name}-")) {
        version = rest;
    }
    if let Some(rest) = version.strip_prefix(&format!("{name}_")) {
        version = rest;
    }
    version.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(root: &str, siteroot: &str) -> Unit {
        Unit {
            name: "ROOT".into(),
            version: "5.34.10".into(),
            root: root.into(),
            variant: "x86_64-slc6-gcc47-opt".into(),
            siteroot: siteroot.into(),
            dirs: vec![],
        }
    }

    #[test]
    fn names_follow_name_version_variant() {
        let unit = unit("/opt/sw/ROOT", "/opt/sw");
        assert_eq!(unit.prefix(), "ROOT-5.34.10");
        assert_eq!(
            unit.archive_file_name(),
            "ROOT-5.34.10-x86_64-slc6-gcc47-opt.tar.gz"
        );
    }

    #[test]
    fn home_dir_is_relative_to_siteroot() {
        assert_eq!(
            unit("/opt/sw/lcg/ROOT/5.34", "/opt/sw").home_dir(),
            "lcg/ROOT/5.34"
        );
        assert_eq!(unit("/opt/sw", "/opt/sw").home_dir(), "");
        assert_eq!(unit("/data/ROOT", "/opt/sw").home_dir(), "data/ROOT");
    }

    #[test]
    fn version_prefixes_are_stripped_once() {
        assert_eq!(normalize_version("boost", "boost-1.55.0"), "1.55.0");
        assert_eq!(normalize_version("boost", "boost_1_55_0"), "1_55_0");
        assert_eq!(normalize_version("boost", "1.55.0"), "1.55.0");
        assert_eq!(normalize_version("boost", "boost-boost-1.55"), "boost-1.55");
        assert_eq!(normalize_version("boost", "boost-boost_1.55"), "1.55");
        assert_eq!(normalize_version("boost", "libboost-1.55"), "libboost-1.55");
    }
}
