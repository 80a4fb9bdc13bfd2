use bson::{Bson, Document};

use crate::error::ImportError;

/// One query against one collection, with an optional row cap.
///
/// `limit: None` is unbounded. A cap of zero is normalized to `None`, which
/// is how the server itself treats a zero limit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    filter: Document,
    collection: String,
    limit: Option<u64>,
}

impl QueryRequest {
    pub fn new(
        filter: Document,
        collection: impl Into<String>,
        limit: Option<u64>,
    ) -> Result<Self, ImportError> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(ImportError::severe("collection must be supplied"));
        }
        Ok(Self {
            filter,
            collection,
            limit: limit.filter(|&n| n > 0),
        })
    }

    /// Build a request from query text in (extended) JSON filter syntax.
    ///
    /// Blank text is the empty filter. `{"_id": {"$oid": "..."}}` and the
    /// other extended JSON forms decode to their native BSON types.
    pub fn parse(
        query: &str,
        collection: impl Into<String>,
        limit: Option<u64>,
    ) -> Result<Self, ImportError> {
        Self::new(parse_filter(query)?, collection, limit)
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

fn parse_filter(query: &str) -> Result<Document, ImportError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Document::new());
    }
    let json: serde_json::Value = serde_json::from_str(query)
        .map_err(|e| ImportError::wrap(format!("invalid query: {query}"), e))?;
    match Bson::try_from(json) {
        Ok(Bson::Document(filter)) => Ok(filter),
        Ok(_) => Err(ImportError::severe(format!(
            "query must be a JSON object: {query}"
        ))),
        Err(e) => Err(ImportError::wrap(format!("invalid query: {query}"), e)),
    }
}
