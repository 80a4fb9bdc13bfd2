use bson::{Bson, Document};

use crate::error::PathError;
use crate::path::{leaf_paths, resolve};

/// How a source document is turned into row keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlattenMode {
    /// One key per leaf path (`address.city`, `items.0.sku`, ...).
    #[default]
    Flatten,
    /// Top-level keys only; nested values are carried whole.
    Passthrough,
}

impl FlattenMode {
    pub fn from_flag(flatten: bool) -> Self {
        if flatten {
            FlattenMode::Flatten
        } else {
            FlattenMode::Passthrough
        }
    }
}

/// One output row: field path (or top-level key) to value.
///
/// Values are scalars, arrays, or whole sub-documents when a passthrough
/// key or an index path lands on one. Rows are built fresh per source
/// document and own everything they hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow {
    fields: Document,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Bson>) -> Option<Bson> {
        self.fields.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Bson> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Bson> {
        self.fields.iter_mut().map(|(_, v)| v)
    }

    pub fn as_document(&self) -> &Document {
        &self.fields
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}

impl From<Document> for FlatRow {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

/// Build a row from one source document.
///
/// In [`FlattenMode::Flatten`] every leaf path from [`leaf_paths`] becomes a
/// key and its value is looked up with [`resolve`]. In
/// [`FlattenMode::Passthrough`] the document's own top-level keys are used
/// as they are; a key containing a dot is not resolved as a path.
///
/// Resolved values are copied out whole: sub-documents become plain
/// `Bson::Document` mappings and arrays keep every element, so the row does
/// not borrow from the cursor's document.
pub fn materialize(doc: &Document, mode: FlattenMode) -> Result<FlatRow, PathError> {
    let mut row = FlatRow::new();
    match mode {
        FlattenMode::Flatten => {
            for path in leaf_paths(doc)? {
                let value = resolve(doc, &path)?.cloned().unwrap_or(Bson::Null);
                row.insert(path, value);
            }
        }
        FlattenMode::Passthrough => {
            for (key, value) in doc {
                row.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(row)
}
