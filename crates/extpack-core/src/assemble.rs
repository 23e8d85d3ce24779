use std::env;
use std::fs;

use camino::Utf8PathBuf;
use extpack_domain::{archive_file_name, ProjectInfos, Unit};
use serde::Serialize;
use tracing::{debug, info};

use crate::archive::{extract_stripped, write_archive};
use crate::config::PackConfig;
use crate::error::{fs_error, PackError, Result};

pub const APPNAME_KEY: &str = "HWAF_BDIST_APPNAME";
pub const APPVERSION_KEY: &str = "HWAF_BDIST_VERSION";

/// Name and version of a project-level distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSpec {
    pub name: String,
    pub version: String,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Uses the explicit values when given, the bdist keys of the project otherwise.
    pub fn resolve(
        infos: &dyn ProjectInfos,
        name: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self> {
        let name = match name {
            Some(name) => name.to_string(),
            None => infos.get(APPNAME_KEY)?,
        };
        let version = match version {
            Some(version) => version.to_string(),
            None => infos.get(APPVERSION_KEY)?,
        };
        Ok(Self { name, version })
    }

    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Rebuilds the install layout from per-unit archives and packs it as one tarball.
#[derive(Debug, Clone, Copy)]
pub struct ProjectAssembler<'a> {
    config: &'a PackConfig,
}

impl<'a> ProjectAssembler<'a> {
    pub fn new(config: &'a PackConfig) -> Self {
        Self { config }
    }

    /// Expects the archive of every unit to exist in the output directory already.
    pub fn assemble(&self, units: &[Unit], project: &ProjectSpec) -> Result<Utf8PathBuf> {
        let Some(first) = units.first() else {
            return Err(PackError::EmptyProject);
        };
        let temp_root =
            Utf8PathBuf::from_path_buf(env::temp_dir()).map_err(PackError::NonUtf8Path)?;
        let scratch = tempfile::Builder::new()
            .prefix("extpack-")
            .tempdir_in(&temp_root)
            .map_err(fs_error("failed to create scratch directory in", &temp_root))?;
        let scratch_root = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
            .map_err(PackError::NonUtf8Path)?;
        let dir_name = project.dir_name();
        let project_dir = scratch_root.join(&dir_name);
        info!(dir = %project_dir, "assembling project");

        for unit in units {
            let dest = project_dir.join(unit.home_dir());
            fs::create_dir_all(&dest).map_err(fs_error("failed to create", &dest))?;
            let archive = self.config.archive_path(&unit.archive_file_name());
            debug!(unit = %unit.name, archive = %archive, dest = %dest, "unpacking");
            extract_stripped(&archive, &dest)?;
        }

        let path = self.config.archive_path(&archive_file_name(
            &project.name,
            &project.version,
            &first.variant,
        ));
        info!(archive = %path, "packing project");
        write_archive(
            &path,
            std::slice::from_ref(&project_dir),
            &project_dir,
            &dir_name,
            self.config.ignore(),
        )?;
        scratch
            .close()
            .map_err(fs_error("failed to remove scratch directory", &scratch_root))?;
        Ok(path)
    }
}
