//! Project metadata as recorded by the build system.
//!
//! The packer only needs key enumeration and string lookups, so the provider is a small
//! trait. [`CacheFile`] reads the waf `c4che` cache written at configure time;
//! [`MemoryInfos`] serves tests and callers that already hold the values.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use camino::Utf8Path;
use tracing::debug;

pub const VARIANT_KEY: &str = "HWAF_VARIANT";
pub const SITEROOT_KEY: &str = "SITEROOT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InfoError {
    #[error("no such project info key [{0}]")]
    MissingKey(String),
    #[error("project info [{key}] is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

pub trait ProjectInfos {
    /// All known keys, in a stable order.
    fn keys(&self) -> Vec<String>;

    fn get(&self, key: &str) -> Result<String, InfoError>;

    /// Build variant shared by every unit of the project.
    fn variant(&self) -> Result<String, InfoError> {
        self.get(VARIANT_KEY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryInfos {
    values: BTreeMap<String, String>,
}

impl MemoryInfos {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl ProjectInfos for MemoryInfos {
    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Result<String, InfoError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| InfoError::MissingKey(key.to_string()))
    }
}

/// Values parsed from a waf `ConfigSet` dump (`KEY = 'value'` per line).
///
/// Quoted scalars are returned unquoted; list literals and anything else come back raw.
#[derive(Debug, Clone, Default)]
pub struct CacheFile {
    values: BTreeMap<String, String>,
    variant: Option<String>,
}

impl CacheFile {
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project infos {path}"))?;
        let cache = Self::parse(&contents).with_context(|| format!("failed to parse {path}"))?;
        debug!(path = %path, keys = cache.values.len(), "loaded project infos");
        Ok(cache)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                bail!("line {}: expected `KEY = VALUE`", idx + 1);
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("line {}: empty key", idx + 1);
            }
            values.insert(key.to_string(), value.trim().to_string());
        }
        Ok(Self {
            values,
            variant: None,
        })
    }

    /// Overrides the variant recorded in the cache.
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

impl ProjectInfos for CacheFile {
    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Result<String, InfoError> {
        let raw = self
            .values
            .get(key)
            .ok_or_else(|| InfoError::MissingKey(key.to_string()))?;
        unquote(raw).map_err(|reason| InfoError::Malformed {
            key: key.to_string(),
            reason,
        })
    }

    fn variant(&self) -> Result<String, InfoError> {
        match &self.variant {
            Some(variant) => Ok(variant.clone()),
            None => self.get(VARIANT_KEY),
        }
    }
}

fn unquote(raw: &str) -> Result<String, String> {
    let Some(quote) = raw.chars().next().filter(|c| *c == '\'' || *c == '"') else {
        return Ok(raw.to_string());
    };
    let body = raw
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .ok_or_else(|| format!("unterminated string {raw}"))?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => return Err(format!("dangling escape in {raw}")),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: &str = r#"
# waf cache
HWAF_VARIANT = 'x86_64-slc6-gcc47-opt'
SITEROOT = '/opt/sw'
boost_export_paths = ['/opt/sw/boost/include', '/opt/sw/boost/lib']
boost_home = '/opt/sw/boost'
boost_native_version = 'boost-1.55.0'
QUOTED = "it's"
ESCAPED = 'a\'b\\c'
JOBS = 4
"#;

    #[test]
    fn parses_scalars_and_lists() {
        let cache = CacheFile::parse(CACHE).unwrap();
        assert_eq!(cache.get("SITEROOT").unwrap(), "/opt/sw");
        assert_eq!(cache.get("boost_native_version").unwrap(), "boost-1.55.0");
        assert_eq!(
            cache.get("boost_export_paths").unwrap(),
            "['/opt/sw/boost/include', '/opt/sw/boost/lib']"
        );
        assert_eq!(cache.get("QUOTED").unwrap(), "it's");
        assert_eq!(cache.get("ESCAPED").unwrap(), "a'b\\c");
        assert_eq!(cache.get("JOBS").unwrap(), "4");
    }

    #[test]
    fn keys_are_sorted() {
        let cache = CacheFile::parse(CACHE).unwrap();
        let keys = cache.keys();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn missing_keys_are_reported() {
        let cache = CacheFile::parse(CACHE).unwrap();
        assert_eq!(
            cache.get("zlib_home"),
            Err(InfoError::MissingKey("zlib_home".into()))
        );
    }

    #[test]
    fn variant_can_be_overridden() {
        let cache = CacheFile::parse(CACHE).unwrap();
        assert_eq!(cache.variant().unwrap(), "x86_64-slc6-gcc47-opt");
        let cache = cache.with_variant("aarch64-linux-clang-dbg");
        assert_eq!(cache.variant().unwrap(), "aarch64-linux-clang-dbg");
    }

    #[test]
    fn rejects_lines_without_assignment() {
        let err = CacheFile::parse("SITEROOT '/opt'\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn unterminated_strings_are_malformed() {
        let cache = CacheFile::parse("BROKEN = 'abc\n").unwrap();
        assert!(matches!(
            cache.get("BROKEN"),
            Err(InfoError::Malformed { .. })
        ));
    }

    #[test]
    fn load_reads_from_disk() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("_cache.py");
        std::fs::write(&path, CACHE)?;
        let path = Utf8Path::from_path(&path).context("utf-8 temp path")?;
        let cache = CacheFile::load(path)?;
        assert_eq!(cache.get("boost_home")?, "/opt/sw/boost");
        Ok(())
    }

    #[test]
    fn memory_infos_round_trip() {
        let infos = MemoryInfos::new()
            .with(VARIANT_KEY, "opt")
            .with("a_home", "/a");
        assert_eq!(infos.keys(), vec![VARIANT_KEY.to_string(), "a_home".into()]);
        assert_eq!(infos.variant().unwrap(), "opt");
    }
}
