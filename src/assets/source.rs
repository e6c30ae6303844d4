use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{GridsheetError, GridsheetResult};

/// Locator for one source image plus its position in the caller's list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Opaque locator resolved by an [`ImageSource`].
    pub source: String,
    /// 0-based position in the caller's ordered list.
    pub ordinal: usize,
}

impl ImageRef {
    /// Create a reference.
    pub fn new(source: impl Into<String>, ordinal: usize) -> Self {
        Self {
            source: source.into(),
            ordinal,
        }
    }

    /// Number an ordered list of locators.
    pub fn list<I, S>(sources: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        sources
            .into_iter()
            .enumerate()
            .map(|(i, s)| Self::new(s, i))
            .collect()
    }
}

/// Resolves a locator to encoded image bytes.
///
/// Implementations may fail transiently; acquisition retries through [`crate::RetryPolicy`].
pub trait ImageSource {
    /// Fetch the encoded bytes behind `locator`.
    fn fetch(&self, locator: &str) -> GridsheetResult<Vec<u8>>;
}

/// Filesystem source resolving locators relative to a root directory.
#[derive(Clone, Debug)]
pub struct FsImageSource {
    root: PathBuf,
    allow_absolute: bool,
}

impl FsImageSource {
    /// Resolve relative locators under `root`; absolute paths and `..` are rejected.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allow_absolute: false,
        }
    }

    /// Also accept absolute locators as-is.
    pub fn allow_absolute(mut self, allow: bool) -> Self {
        self.allow_absolute = allow;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, locator: &str) -> GridsheetResult<PathBuf> {
        let p = Path::new(locator);
        if p.is_absolute() {
            if self.allow_absolute {
                return Ok(p.to_path_buf());
            }
            return Err(GridsheetError::validation(format!(
                "absolute image path '{locator}' not allowed"
            )));
        }
        let norm = normalize_rel_path(locator)?;
        Ok(self.root.join(Path::new(&norm)))
    }
}

impl ImageSource for FsImageSource {
    fn fetch(&self, locator: &str) -> GridsheetResult<Vec<u8>> {
        let path = self.resolve(locator)?;
        std::fs::read(&path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))
            .map_err(GridsheetError::from)
    }
}

/// In-memory source keyed by locator.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageSource {
    entries: HashMap<String, Arc<Vec<u8>>>,
}

impl MemoryImageSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes under `locator`, replacing any previous entry.
    pub fn insert(&mut self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(locator.into(), Arc::new(bytes));
    }

    /// Builder-style [`MemoryImageSource::insert`].
    pub fn with(mut self, locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(locator, bytes);
        self
    }

    /// Number of registered locators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ImageSource for MemoryImageSource {
    fn fetch(&self, locator: &str) -> GridsheetResult<Vec<u8>> {
        self.entries
            .get(locator)
            .map(|b| b.as_ref().clone())
            .ok_or_else(|| anyhow::anyhow!("no image registered for '{locator}'").into())
    }
}

/// Normalize and validate a relative locator.
///
/// The result uses `/` separators, drops `.` segments, and rejects absolute paths or parent
/// traversals (`..`).
pub fn normalize_rel_path(source: &str) -> GridsheetResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(GridsheetError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(GridsheetError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(GridsheetError::validation(
                "image paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(GridsheetError::validation(
            "image path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
