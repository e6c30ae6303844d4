use std::collections::BTreeMap;

use crate::foundation::error::GridsheetResult;
use crate::store::object::{Keyed, ObjectStore};

/// In-process store; nothing survives the value.
#[derive(Clone, Debug)]
pub struct MemoryStore<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T> MemoryStore<T> {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Keyed + Clone> ObjectStore<T> for MemoryStore<T> {
    fn put(&mut self, item: T) -> GridsheetResult<()> {
        self.items.insert(item.key().to_owned(), item);
        Ok(())
    }

    fn put_many(&mut self, items: Vec<T>) -> GridsheetResult<()> {
        for item in items {
            self.items.insert(item.key().to_owned(), item);
        }
        Ok(())
    }

    fn get_all(&self) -> GridsheetResult<Vec<T>> {
        Ok(self.items.values().cloned().collect())
    }

    fn delete(&mut self, key: &str) -> GridsheetResult<bool> {
        Ok(self.items.remove(key).is_some())
    }

    fn clear(&mut self) -> GridsheetResult<()> {
        self.items.clear();
        Ok(())
    }
}
