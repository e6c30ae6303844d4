use serde::{Deserialize, Serialize};

use crate::assets::source::ImageRef;
use crate::foundation::error::GridsheetResult;

/// Items that carry their own store key.
pub trait Keyed {
    /// Unique key within a store.
    fn key(&self) -> &str;
}

/// Keyed object store used by the host application for imported images and settings.
///
/// Every call is atomic: a failed call leaves the contents observed by [`ObjectStore::get_all`]
/// exactly as they were before it.
pub trait ObjectStore<T: Keyed> {
    /// Insert or replace one item.
    fn put(&mut self, item: T) -> GridsheetResult<()>;
    /// Insert or replace several items; either all of them are stored or none.
    fn put_many(&mut self, items: Vec<T>) -> GridsheetResult<()>;
    /// Every stored item, in key order.
    fn get_all(&self) -> GridsheetResult<Vec<T>>;
    /// Remove the item stored under `key`; returns whether one was present.
    fn delete(&mut self, key: &str) -> GridsheetResult<bool>;
    /// Remove everything.
    fn clear(&mut self) -> GridsheetResult<()>;
}

/// An imported image as the host application persists it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Store key.
    pub id: String,
    /// Locator handed to the image source.
    pub source: String,
    /// User-chosen position in the sheet order.
    pub position: u32,
}

impl Keyed for StoredImage {
    fn key(&self) -> &str {
        &self.id
    }
}

impl StoredImage {
    /// Build a record.
    pub fn new(id: impl Into<String>, source: impl Into<String>, position: u32) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            position,
        }
    }

    /// Render order for stored images: by position, ties broken by key.
    pub fn ordered_refs(mut images: Vec<StoredImage>) -> Vec<ImageRef> {
        images.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        ImageRef::list(images.into_iter().map(|img| img.source))
    }
}
