use std::env;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::{fs_error, PackError, Result};

pub const DEFAULT_OUTPUT_DIR: &str = "packs";
pub const DEFAULT_IGNORE: &[&str] = &[".svn"];

/// Settings shared by collection, packing and project assembly for one run.
#[derive(Debug, Clone)]
pub struct PackConfig {
    output_dir: Utf8PathBuf,
    ignore: Vec<String>,
    selected: Vec<String>,
}

impl PackConfig {
    /// Resolves `output_dir` against the current directory; empty and `.` mean the
    /// current directory itself.
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        let output_dir = if output_dir.is_absolute() {
            output_dir
        } else {
            let cwd = env::current_dir()
                .map_err(fs_error("failed to resolve current directory", Utf8Path::new(".")))?;
            let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(PackError::NonUtf8Path)?;
            if output_dir.as_str().is_empty() || output_dir.as_str() == "." {
                cwd
            } else {
                cwd.join(output_dir)
            }
        };
        Ok(Self {
            output_dir,
            ignore: DEFAULT_IGNORE.iter().map(ToString::to_string).collect(),
            selected: Vec::new(),
        })
    }

    /// Restricts collection to the given package names. An empty list selects everything.
    #[must_use]
    pub fn with_selected<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }

    pub fn selects(&self, name: &str) -> bool {
        self.selected.is_empty() || self.selected.iter().any(|selected| selected == name)
    }

    pub fn archive_path(&self, file_name: &str) -> Utf8PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn ensure_output_dir(&self) -> Result<()> {
        if self.output_dir.is_dir() {
            return Ok(());
        }
        debug!(dir = %self.output_dir, "creating output directory");
        fs::create_dir_all(&self.output_dir)
            .map_err(fs_error("could not create directory", &self.output_dir))
    }
}
