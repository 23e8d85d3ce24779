use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Component, Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use extpack_domain::{relativize_path, Unit};
use flate2::{read::GzDecoder, write::GzEncoder, Compression, GzBuilder};
use tar::{Archive, Builder, Header, HeaderMode};
use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::config::PackConfig;
use crate::error::{fs_error, lossy_fs_error, lossy_utf8, PackError, Result};

const OWNER: &str = "root";

/// Packs the exported directories of a unit into `<name>-<version>-<variant>.tar.gz`.
#[derive(Debug, Clone, Copy)]
pub struct TreeArchiver<'a> {
    config: &'a PackConfig,
}

impl<'a> TreeArchiver<'a> {
    pub fn new(config: &'a PackConfig) -> Self {
        Self { config }
    }

    /// Path the archive of `unit` is written to.
    pub fn archive_path(&self, unit: &Unit) -> Utf8PathBuf {
        self.config.archive_path(&unit.archive_file_name())
    }

    pub fn archive(&self, unit: &Unit) -> Result<Utf8PathBuf> {
        let path = self.archive_path(unit);
        info!(unit = %unit.name, root = %unit.root, "packing");
        write_archive(
            &path,
            &unit.dirs,
            &unit.root,
            &unit.prefix(),
            self.config.ignore(),
        )?;
        info!(unit = %unit.name, archive = %path, "packed");
        Ok(path)
    }
}

/// Writes every tree in `dirs` into one gzip-compressed tarball at `path`.
///
/// Member names are `prefix` joined with the entry path relative to `root`. Entries whose
/// file name is listed in `ignore` are pruned together with everything below them. A tree
/// whose top directory is a symlink is stored as that single link.
pub(crate) fn write_archive(
    path: &Utf8Path,
    dirs: &[Utf8PathBuf],
    root: &Utf8Path,
    prefix: &str,
    ignore: &[String],
) -> Result<()> {
    let file = File::create(path).map_err(fs_error("failed to create archive", path))?;
    let encoder = GzBuilder::new()
        .mtime(0)
        .write(file, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);
    for dir in dirs {
        append_tree(&mut builder, dir, root, prefix, ignore)?;
    }
    finish(builder, path)
}

// The builder, encoder and file are unwound in that order on drop as well, so an early
// return still leaves a closed (if incomplete) archive behind. Only this path syncs the file,
// so write-back errors surface here.
fn finish(builder: Builder<GzEncoder<File>>, path: &Utf8Path) -> Result<()> {
    let encoder = builder
        .into_inner()
        .map_err(fs_error("failed to finalize archive", path))?;
    let file = encoder
        .finish()
        .map_err(fs_error("failed to finalize compression of", path))?;
    file.sync_all().map_err(fs_error("failed to sync", path))
}

fn append_tree<W: Write>(
    builder: &mut Builder<W>,
    workdir: &Utf8Path,
    root: &Utf8Path,
    prefix: &str,
    ignore: &[String],
) -> Result<()> {
    let walker = WalkDir::new(workdir)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry
                .file_name()
                .to_str()
                .is_some_and(|name| ignore.iter().any(|ignored| ignored == name))
        });
    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        let path = entry.path();
        if path.as_os_str().is_empty() {
            return Err(PackError::Structural("empty path".to_string()));
        }
        if !path.starts_with(workdir) {
            return Err(PackError::Structural(format!(
                "walked filename {} doesn't begin with workdir {workdir}",
                path.display()
            )));
        }
        let rel = relativize_path(path, root.as_std_path());
        let name = if rel.as_os_str().is_empty() {
            PathBuf::from(prefix)
        } else {
            Path::new(prefix).join(rel)
        };
        append_entry(builder, path, &name)?;
    }
    Ok(())
}

fn append_entry<W: Write>(builder: &mut Builder<W>, path: &Path, name: &Path) -> Result<()> {
    let metadata =
        fs::symlink_metadata(path).map_err(lossy_fs_error("failed to read metadata of", path))?;
    let file_type = metadata.file_type();
    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
    header.set_uid(0);
    header.set_gid(0);
    header
        .set_username(OWNER)
        .map_err(lossy_fs_error("failed to set owner of", path))?;
    header
        .set_groupname(OWNER)
        .map_err(lossy_fs_error("failed to set group of", path))?;
    header.set_mode(normalized_mode(&metadata));
    trace!(member = %name.display(), "adding");

    let written = if file_type.is_symlink() {
        let target =
            fs::read_link(path).map_err(lossy_fs_error("failed to read symlink", path))?;
        header.set_size(0);
        builder.append_link(&mut header, name, &target)
    } else if file_type.is_file() {
        let file = File::open(path).map_err(lossy_fs_error("failed to open", path))?;
        builder.append_data(&mut header, name, file)
    } else {
        header.set_size(0);
        builder.append_data(&mut header, name, io::empty())
    };
    written.map_err(lossy_fs_error("failed to write archive member for", path))
}

/// 0755 for anything with an executable bit, 0644 otherwise. File type bits are kept.
fn normalized_mode(metadata: &fs::Metadata) -> u32 {
    let perm = if is_executable(metadata) { 0o755 } else { 0o644 };
    raw_mode(metadata) & !0o777 | perm
}

#[cfg(unix)]
fn raw_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn raw_mode(_metadata: &fs::Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    raw_mode(metadata) & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &fs::Metadata) -> bool {
    metadata.is_dir()
}

fn walk_error(err: walkdir::Error) -> PackError {
    let path = err.path().map(lossy_utf8).unwrap_or_default();
    match err.into_io_error() {
        Some(source) => PackError::Filesystem {
            action: "failed to walk",
            path,
            source,
        },
        None => PackError::Structural(format!("filesystem loop at [{path}]")),
    }
}

/// Unpacks `archive` into `dest`, dropping the leading `<name>-<version>/` of every member.
pub(crate) fn extract_stripped(archive: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    let extract_error = |reason: String| PackError::Extract {
        archive: archive.to_owned(),
        reason,
    };
    let file = File::open(archive).map_err(fs_error("failed to open archive", archive))?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    let entries = tar.entries().map_err(|err| extract_error(err.to_string()))?;
    let mut count = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|err| extract_error(err.to_string()))?;
        let member = entry
            .path()
            .map_err(|err| extract_error(err.to_string()))?
            .into_owned();
        let Some(relative) = strip_first_component(&member).map_err(extract_error)? else {
            continue;
        };
        let target = dest.as_std_path().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| extract_error(format!("{}: {err}", parent.display())))?;
        }
        entry
            .unpack(&target)
            .map_err(|err| extract_error(format!("{}: {err}", member.display())))?;
        count += 1;
    }
    debug!(archive = %archive, dest = %dest, members = count, "extracted");
    Ok(())
}

fn strip_first_component(member: &Path) -> Result<Option<PathBuf>, String> {
    let mut parts = Vec::new();
    for component in member.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            _ => return Err(format!("refusing to unpack {}", member.display())),
        }
    }
    let stripped: PathBuf = parts.into_iter().skip(1).collect();
    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}
