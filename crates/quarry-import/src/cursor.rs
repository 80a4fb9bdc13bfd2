use bson::Document;
use quarry_doc::FlattenMode;
use tracing::info;

use crate::error::ImportError;
use crate::iter::RowIter;
use crate::request::QueryRequest;

/// A server-side cursor over the remaining results of one query.
///
/// The protocol is two-step so that "is there more?" can be answered
/// without taking the document: [`advance`](CursorHandle::advance) moves
/// onto the next result, [`current`](CursorHandle::current) hands it over.
/// Either call may block on a network round trip when the local batch runs
/// dry.
pub trait CursorHandle {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Move onto the next document. `Ok(false)` once the results are exhausted.
    fn advance(&mut self) -> Result<bool, Self::Error>;

    /// Take the document the last successful `advance` moved onto.
    fn current(&mut self) -> Result<Document, Self::Error>;

    /// Release the server-side cursor. Called at most once per handle.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Something that can open cursors for [`QueryRequest`]s.
///
/// The row cap travels with the request and is enforced by the source when
/// the cursor is opened, never by counting rows afterwards.
pub trait DocumentSource {
    type Cursor: CursorHandle;

    fn open(&self, request: &QueryRequest) -> Result<Self::Cursor, ImportError>;

    /// Open a cursor for `request` and wrap it in a lazy row iterator.
    fn get_data(
        &self,
        request: &QueryRequest,
        mode: FlattenMode,
    ) -> Result<RowIter<Self::Cursor>, ImportError> {
        info!(
            collection = request.collection(),
            query = %request.filter(),
            limit = ?request.limit(),
            "started data import"
        );
        let cursor = self.open(request)?;
        Ok(RowIter::new(cursor, mode))
    }
}
