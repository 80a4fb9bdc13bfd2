use std::collections::HashMap;

use bson::{Bson, Document};

use crate::cursor::{CursorHandle, DocumentSource};
use crate::error::ImportError;
use crate::request::QueryRequest;

/// A [`DocumentSource`] over documents held in memory.
///
/// Filters support top-level equality only (`{"status": "active"}`); any
/// `$` operator is rejected when the cursor is opened.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: HashMap<String, Vec<Document>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, docs: Vec<Document>) -> Self {
        self.insert(name, docs);
        self
    }

    /// Append documents to a collection, creating it if needed.
    pub fn insert(&mut self, name: impl Into<String>, docs: Vec<Document>) {
        self.collections.entry(name.into()).or_default().extend(docs);
    }
}

impl DocumentSource for MemorySource {
    type Cursor = MemoryCursor;

    fn open(&self, request: &QueryRequest) -> Result<MemoryCursor, ImportError> {
        let docs = self
            .collections
            .get(request.collection())
            .ok_or_else(|| {
                ImportError::severe(format!("collection not found: {}", request.collection()))
            })?;
        check_filter(request.filter())?;

        let cap = request
            .limit()
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let matched = docs
            .iter()
            .filter(|doc| matches(doc, request.filter()))
            .take(cap)
            .cloned()
            .collect();
        Ok(MemoryCursor::new(matched))
    }
}

fn check_filter(filter: &Document) -> Result<(), ImportError> {
    for (key, value) in filter {
        let operator = key.starts_with('$')
            || matches!(value, Bson::Document(d) if d.keys().any(|k| k.starts_with('$')));
        if operator {
            return Err(ImportError::severe(format!(
                "unsupported filter on `{key}`: only equality is supported in memory"
            )));
        }
    }
    Ok(())
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

/// Cursor over an owned list of documents.
#[derive(Debug)]
pub struct MemoryCursor {
    docs: std::vec::IntoIter<Document>,
    current: Option<Document>,
}

impl MemoryCursor {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: docs.into_iter(),
            current: None,
        }
    }
}

impl CursorHandle for MemoryCursor {
    type Error = ImportError;

    fn advance(&mut self) -> Result<bool, ImportError> {
        self.current = self.docs.next();
        Ok(self.current.is_some())
    }

    fn current(&mut self) -> Result<Document, ImportError> {
        self.current
            .take()
            .ok_or(ImportError::IllegalState("no current document"))
    }
}
