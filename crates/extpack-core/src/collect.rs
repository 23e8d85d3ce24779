use camino::{Utf8Path, Utf8PathBuf};
use extpack_domain::{decode_path_list, normalize_version, ProjectInfos, Unit, SITEROOT_KEY};
use tracing::{debug, error, warn};

use crate::config::PackConfig;
use crate::error::{PackError, Result};

pub const EXPORT_PATHS_SUFFIX: &str = "_export_paths";
pub const HOME_SUFFIX: &str = "_home";
pub const NATIVE_VERSION_SUFFIX: &str = "_native_version";

/// Discovers packable units from project metadata.
pub struct PackageCollector<'a> {
    infos: &'a dyn ProjectInfos,
    config: &'a PackConfig,
}

impl<'a> PackageCollector<'a> {
    pub fn new(infos: &'a dyn ProjectInfos, config: &'a PackConfig) -> Self {
        Self { infos, config }
    }

    /// Every `<name>_export_paths` key names a candidate unit.
    ///
    /// A unit whose home cannot be resolved fails the whole collection, but only after
    /// all other candidates were looked at so every broken unit gets reported. Units
    /// without a single existing export directory are skipped.
    pub fn collect(&self) -> Result<Vec<Unit>> {
        let variant = self.infos.variant()?;
        let siteroot = Utf8PathBuf::from(self.infos.get(SITEROOT_KEY)?);

        let mut units = Vec::new();
        let mut broken = Vec::new();
        for key in self.infos.keys() {
            let Some(name) = key.strip_suffix(EXPORT_PATHS_SUFFIX) else {
                continue;
            };
            if name.is_empty() {
                debug!(key = %key, "ignoring export paths without a package name");
                continue;
            }
            if !self.config.selects(name) {
                continue;
            }

            let root = match self.infos.get(&format!("{name}{HOME_SUFFIX}")) {
                Ok(root) => root,
                Err(err) => {
                    error!(unit = name, %err, "cannot resolve package home");
                    broken.push(name.to_string());
                    continue;
                }
            };
            let raw_version = self.infos.get(&format!("{name}{NATIVE_VERSION_SUFFIX}"))?;
            let raw_dirs = self.infos.get(&key)?;

            let dirs = existing_dirs(name, decode_path_list(&raw_dirs));
            if dirs.is_empty() {
                warn!(unit = name, "empty dirs for pack");
                continue;
            }
            units.push(Unit {
                name: name.to_string(),
                version: normalize_version(name, &raw_version),
                root: root.into(),
                variant: variant.clone(),
                siteroot: siteroot.clone(),
                dirs,
            });
        }

        if !broken.is_empty() {
            return Err(PackError::Collection { units: broken });
        }
        debug!(count = units.len(), "collected packages");
        Ok(units)
    }
}

fn existing_dirs(name: &str, dirs: Vec<String>) -> Vec<Utf8PathBuf> {
    dirs.into_iter()
        .filter_map(|dir| {
            if Utf8Path::new(&dir).exists() {
                Some(Utf8PathBuf::from(dir))
            } else {
                warn!(unit = name, dir = %dir, "no such directory");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extpack_domain::{InfoError, MemoryInfos, VARIANT_KEY};
    use std::fs;

    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _temp: TempDir,
        base: Utf8PathBuf,
        infos: MemoryInfos,
    }

    fn fixture() -> Result<Fixture> {
        let temp = tempdir()?;
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("non utf-8 {}", p.display()))?;
        let boost = base.join("sw").join("boost");
        fs::create_dir_all(boost.join("include"))?;
        fs::create_dir_all(boost.join("lib"))?;
        let infos = MemoryInfos::new()
            .with(VARIANT_KEY, "x86_64-linux-gcc-opt")
            .with(SITEROOT_KEY, base.join("sw").as_str())
            .with("boost_home", boost.as_str())
            .with("boost_native_version", "boost-1.55.0")
            .with(
                "boost_export_paths",
                format!("['{}', '{}']", boost.join("include"), boost.join("lib")),
            );
        Ok(Fixture {
            _temp: temp,
            base,
            infos,
        })
    }

    fn config() -> PackConfig {
        PackConfig::new("/tmp/packs").expect("config")
    }

    #[test]
    fn collects_units_with_normalized_versions() -> Result<()> {
        let fx = fixture()?;
        let config = config();
        let units = PackageCollector::new(&fx.infos, &config).collect()?;
        assert_eq!(units.len(), 1);
        let boost = &units[0];
        assert_eq!(boost.name, "boost");
        assert_eq!(boost.version, "1.55.0");
        assert_eq!(boost.variant, "x86_64-linux-gcc-opt");
        assert_eq!(boost.siteroot, fx.base.join("sw"));
        assert_eq!(boost.root, fx.base.join("sw").join("boost"));
        assert_eq!(boost.dirs.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_directories_are_dropped() -> Result<()> {
        let fx = fixture()?;
        let existing = fx.base.join("sw").join("boost").join("include");
        let infos = fx.infos.clone().with(
            "boost_export_paths",
            format!("['{existing}', '{}']", fx.base.join("gone")),
        );
        let config = config();
        let units = PackageCollector::new(&infos, &config).collect()?;
        assert_eq!(units[0].dirs, vec![existing]);
        Ok(())
    }

    #[test]
    fn units_without_existing_dirs_are_excluded() -> Result<()> {
        let fx = fixture()?;
        let infos = fx
            .infos
            .clone()
            .with("zlib_home", fx.base.join("sw").join("zlib").as_str())
            .with("zlib_native_version", "1.2.8")
            .with("zlib_export_paths", fx.base.join("sw").join("zlib").as_str());
        let config = config();
        let units = PackageCollector::new(&infos, &config).collect()?;
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["boost"]);
        Ok(())
    }

    #[test]
    fn allow_list_filters_units() -> Result<()> {
        let fx = fixture()?;
        let config = config().with_selected(["zlib"]);
        let units = PackageCollector::new(&fx.infos, &config).collect()?;
        assert!(units.is_empty());
        Ok(())
    }

    #[test]
    fn missing_home_fails_after_collecting_everything() -> Result<()> {
        let fx = fixture()?;
        let infos = fx
            .infos
            .clone()
            .with("aaa_export_paths", "/nowhere")
            .with("zzz_export_paths", "/nowhere");
        let config = config();
        let err = PackageCollector::new(&infos, &config).collect().unwrap_err();
        match err {
            PackError::Collection { units } => assert_eq!(units, vec!["aaa", "zzz"]),
            other => panic!("unexpected error {other}"),
        }
        Ok(())
    }

    #[test]
    fn missing_native_version_is_fatal() -> Result<()> {
        let fx = fixture()?;
        let infos = fx
            .infos
            .clone()
            .with("zlib_home", "/sw/zlib")
            .with("zlib_export_paths", "/sw/zlib");
        let config = config();
        let err = PackageCollector::new(&infos, &config).collect().unwrap_err();
        assert!(
            matches!(
                &err,
                PackError::Metadata(InfoError::MissingKey(key)) if key == "zlib_native_version"
            ),
            "{err}"
        );
        Ok(())
    }

    #[test]
    fn missing_siteroot_is_fatal() {
        let infos = MemoryInfos::new().with(VARIANT_KEY, "opt");
        let config = config();
        let err = PackageCollector::new(&infos, &config).collect().unwrap_err();
        assert!(matches!(err, PackError::Metadata(_)), "{err}");
    }
}
