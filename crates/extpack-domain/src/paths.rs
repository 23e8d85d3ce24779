//! Path prefix arithmetic used to name archive members and place units under a project root.
//!
//! Everything here works on `/`-separated strings: the paths come straight out of build
//! metadata and are compared as text, never canonicalized against the filesystem.

use std::path::{Component, Path, PathBuf};

const SEPARATOR: char = '/';

/// Returns the longest path shared by `p1` and `p2`, compared segment by segment.
///
/// `/foo/bar/include` and `/foo/barz` share `/foo`, not `/foo/bar`.
pub fn longest_common_prefix(p1: &str, p2: &str) -> String {
    p1.split(SEPARATOR)
        .zip(p2.split(SEPARATOR))
        .take_while(|(lhs, rhs)| lhs == rhs)
        .map(|(segment, _)| segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Rewrites `path` relative to `root` for use as an archive member name.
///
/// A plain string prefix wins; otherwise whatever `path` shares with `root` is dropped.
/// Leading separators are always removed.
pub fn relativize<'a>(path: &'a str, root: &str) -> &'a str {
    let rest = match path.strip_prefix(root) {
        Some(rest) => rest,
        None => {
            let common = longest_common_prefix(root, path);
            &path[common.len()..]
        }
    };
    rest.trim_start_matches(SEPARATOR)
}

/// [`relativize`] for walked filesystem paths, which need not be valid UTF-8.
///
/// Both sides are cleaned with [`normalize_lexically`] first. Paths that are not UTF-8 lose
/// the components they share with `root`.
pub fn relativize_path(path: &Path, root: &Path) -> PathBuf {
    let path = normalize_lexically(path);
    let root = normalize_lexically(root);
    if let (Some(path), Some(root)) = (path.to_str(), root.to_str()) {
        return PathBuf::from(relativize(path, root));
    }
    let shared = path
        .components()
        .zip(root.components())
        .take_while(|(lhs, rhs)| lhs == rhs)
        .count();
    path.components()
        .skip(shared)
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect()
}

/// Drops `.` segments and folds `..` into the segment before it, without touching the disk.
///
/// `..` directly below the root stays at the root; leading `..` of a relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = clean.components().next_back();
                let fold = matches!(last, Some(Component::Normal(_)));
                let keep = matches!(last, None | Some(Component::ParentDir));
                if fold {
                    clean.pop();
                } else if keep {
                    clean.push("..");
                }
            }
            other => clean.push(other),
        }
    }
    clean
}
