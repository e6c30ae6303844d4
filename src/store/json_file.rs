use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::foundation::error::{GridsheetError, GridsheetResult};
use crate::store::object::{Keyed, ObjectStore};

/// Store persisted as one JSON document.
///
/// Each call writes the whole document to a sibling temp file and renames it over the target, so a
/// reader never observes half of a `put_many`. When the write fails the in-memory view is rolled
/// back to the last persisted state.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    items: BTreeMap<String, T>,
}

impl<T> JsonFileStore<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
{
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> GridsheetResult<Self> {
        let path = path.into();
        let items = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read store '{}'", path.display()))?;
            let list: Vec<T> = serde_json::from_str(&text).map_err(|e| {
                GridsheetError::store(format!("parse store '{}': {e}", path.display()))
            })?;
            list.into_iter()
                .map(|item| (item.key().to_owned(), item))
                .collect()
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), items = items.len(), "store opened");
        Ok(Self { path, items })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, next: BTreeMap<String, T>) -> GridsheetResult<()> {
        let list: Vec<&T> = next.values().collect();
        let bytes = serde_json::to_vec_pretty(&list)
            .map_err(|e| GridsheetError::store(format!("serialize store: {e}")))?;
        write_atomic(&self.path, &bytes).map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "store write failed");
            GridsheetError::store(format!("write '{}': {e:#}", self.path.display()))
        })?;
        self.items = next;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory '{}'", parent.display()))?;
    }
    let tmp = tmp_path(path);
    if let Err(e) = std::fs::write(&tmp, bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("write '{}'", tmp.display()));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).context("replace store file");
    }
    Ok(())
}

impl<T> ObjectStore<T> for JsonFileStore<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
{
    fn put(&mut self, item: T) -> GridsheetResult<()> {
        self.put_many(vec![item])
    }

    fn put_many(&mut self, items: Vec<T>) -> GridsheetResult<()> {
        let mut next = self.items.clone();
        for item in items {
            next.insert(item.key().to_owned(), item);
        }
        self.commit(next)
    }

    fn get_all(&self) -> GridsheetResult<Vec<T>> {
        Ok(self.items.values().cloned().collect())
    }

    fn delete(&mut self, key: &str) -> GridsheetResult<bool> {
        if !self.items.contains_key(key) {
            return Ok(false);
        }
        let mut next = self.items.clone();
        next.remove(key);
        self.commit(next)?;
        Ok(true)
    }

    fn clear(&mut self) -> GridsheetResult<()> {
        self.commit(BTreeMap::new())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/json_file.rs"]
mod tests;
