use mongodb::bson::Document;
use mongodb::sync::{Client, Cursor};
use quarry_doc::FlattenMode;
use quarry_import::{CursorHandle, DocumentSource, ImportError, QueryRequest, RowIter};
use tracing::{debug, info};

use crate::config::MongoConfig;

/// A MongoDB database exposed as a [`DocumentSource`].
///
/// Holds one client for the lifetime of the source. Every
/// [`get_data`](MongoDataSource::get_data) call opens its own cursor, owned
/// by the returned [`RowIter`].
pub struct MongoDataSource {
    client: Option<Client>,
    database: String,
    mode: FlattenMode,
}

impl MongoDataSource {
    /// Validate `config` and build a client. The driver connects lazily, so
    /// an unreachable server surfaces on the first query, not here.
    pub fn connect(config: &MongoConfig) -> Result<Self, ImportError> {
        let database = config.database()?.to_string();
        let uri = config.connection_uri()?;
        let client = Client::with_uri_str(&uri)
            .map_err(|e| ImportError::wrap("unable to connect to mongo", e))?;

        info!(
            database = %database,
            hosts = %config.host,
            authenticated = config.username.is_some(),
            "mongo data source ready"
        );
        Ok(Self {
            client: Some(client),
            database,
            mode: config.flatten_mode(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn mode(&self) -> FlattenMode {
        self.mode
    }

    /// Run `query` (extended JSON filter text) against `collection`,
    /// returning at most `limit` rows.
    pub fn get_data(
        &self,
        query: &str,
        collection: &str,
        limit: Option<u64>,
    ) -> Result<RowIter<MongoCursor>, ImportError> {
        let request = QueryRequest::parse(query, collection, limit)?;
        DocumentSource::get_data(self, &request, self.mode)
    }

    /// Drop the client. Iterators already handed out keep their own cursor
    /// and release it themselves.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!(database = %self.database, "mongo client closed");
        }
    }
}

impl DocumentSource for MongoDataSource {
    type Cursor = MongoCursor;

    fn open(&self, request: &QueryRequest) -> Result<MongoCursor, ImportError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ImportError::severe("data source is closed"))?;
        let collection = client
            .database(&self.database)
            .collection::<Document>(request.collection());

        let mut find = collection.find(request.filter().clone());
        if let Some(limit) = request.limit() {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = find.run().map_err(|e| {
            ImportError::wrap(format!("query failed on {}", request.collection()), e)
        })?;
        Ok(MongoCursor {
            inner: Some(cursor),
        })
    }
}

/// A driver cursor adapted to [`CursorHandle`].
///
/// Closing drops the driver cursor, which kills it on the server if it was
/// not already exhausted.
pub struct MongoCursor {
    inner: Option<Cursor<Document>>,
}

impl CursorHandle for MongoCursor {
    type Error = ImportError;

    fn advance(&mut self) -> Result<bool, ImportError> {
        match self.inner.as_mut() {
            Some(cursor) => cursor
                .advance()
                .map_err(|e| ImportError::wrap("cursor advance failed", e)),
            None => Ok(false),
        }
    }

    fn current(&mut self) -> Result<Document, ImportError> {
        let cursor = self
            .inner
            .as_ref()
            .ok_or(ImportError::IllegalState("cursor closed"))?;
        cursor
            .deserialize_current()
            .map_err(|e| ImportError::wrap("failed to decode document", e))
    }

    fn close(&mut self) -> Result<(), ImportError> {
        self.inner.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MongoConfig {
        MongoConfig {
            database: Some("shop".into()),
            map_mongo_fields: false,
            ..Default::default()
        }
    }

    #[test]
    fn connect_requires_database() {
        let err = MongoDataSource::connect(&MongoConfig::default())
            .err()
            .unwrap();
        assert!(err.is_severe());
        assert_eq!(err.to_string(), "database must be supplied");
    }

    #[test]
    fn connect_carries_mode() {
        let source = MongoDataSource::connect(&config()).unwrap();
        assert_eq!(source.database(), "shop");
        assert_eq!(source.mode(), FlattenMode::Passthrough);
    }

    #[test]
    fn bad_query_fails_before_the_server() {
        let source = MongoDataSource::connect(&config()).unwrap();
        let err = source.get_data("[1, 2]", "orders", None).err().unwrap();
        assert!(err.is_severe());
    }

    #[test]
    fn closed_source_refuses_queries() {
        let mut source = MongoDataSource::connect(&config()).unwrap();
        source.close();
        source.close();
        let err = source.get_data("{}", "orders", Some(5)).err().unwrap();
        assert_eq!(err.to_string(), "data source is closed");
    }

    #[test]
    fn closed_cursor_is_exhausted() {
        let mut cursor = MongoCursor { inner: None };
        assert!(!cursor.advance().unwrap());
        assert!(matches!(
            cursor.current(),
            Err(ImportError::IllegalState(_))
        ));
    }
}
