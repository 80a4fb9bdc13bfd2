use quarry_doc::{FlatRow, FlattenMode, materialize};
use tracing::{debug, warn};

use crate::cursor::CursorHandle;
use crate::error::ImportError;

/// Lifecycle of the cursor behind a [`RowIter`].
///
/// `Open` is the only state holding a cursor. The other three are terminal
/// and are reached by releasing it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Open,
    /// The cursor reported no more results.
    Exhausted,
    /// The caller closed (or dropped) the iterator early.
    Closed,
    /// The cursor or row materialization failed.
    Errored,
}

/// Pull-based row producer over a cursor.
///
/// Each [`next_row`](RowIter::next_row) takes one document from the cursor
/// and flattens it; nothing is fetched ahead beyond the single document
/// `has_next` had to move onto. The cursor is released automatically on
/// exhaustion, on error, on [`close`](RowIter::close), and on drop,
/// whichever comes first. Later releases are no-ops.
///
/// Also usable as an [`Iterator`] of `Result<FlatRow, ImportError>`; the
/// iterator ends after the first error.
pub struct RowIter<C: CursorHandle> {
    cursor: Option<C>,
    mode: FlattenMode,
    state: CursorState,
    // `advance` moved onto a document that `next_row` has not taken yet.
    pending: bool,
}

impl<C: CursorHandle> RowIter<C> {
    pub fn new(cursor: C, mode: FlattenMode) -> Self {
        Self {
            cursor: Some(cursor),
            mode,
            state: CursorState::Open,
            pending: false,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn mode(&self) -> FlattenMode {
        self.mode
    }

    /// Whether another row is available.
    ///
    /// Returns `Ok(false)` forever once the cursor has been released. A
    /// cursor failure releases the cursor before the error is returned.
    pub fn has_next(&mut self) -> Result<bool, ImportError> {
        if self.pending {
            return Ok(true);
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };
        match cursor.advance() {
            Ok(true) => {
                self.pending = true;
                Ok(true)
            }
            Ok(false) => {
                self.release(CursorState::Exhausted);
                Ok(false)
            }
            Err(e) => {
                self.release(CursorState::Errored);
                Err(ImportError::wrap("failed to read from cursor", e))
            }
        }
    }

    /// Produce the next row.
    ///
    /// Fails with [`ImportError::IllegalState`] when `has_next` would
    /// return false; the cursor is not touched in that case.
    pub fn next_row(&mut self) -> Result<FlatRow, ImportError> {
        if !self.has_next()? {
            return Err(ImportError::IllegalState("no more rows"));
        }
        self.pending = false;
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(ImportError::IllegalState("cursor already released"));
        };

        let doc = match cursor.current() {
            Ok(doc) => doc,
            Err(e) => {
                self.release(CursorState::Errored);
                return Err(ImportError::wrap("failed to read from cursor", e));
            }
        };
        match materialize(&doc, self.mode) {
            Ok(row) => Ok(row),
            Err(e) => {
                self.release(CursorState::Errored);
                Err(e.into())
            }
        }
    }

    /// Release the cursor without draining it. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.release(CursorState::Closed);
    }

    fn release(&mut self, next: CursorState) {
        self.pending = false;
        let Some(mut cursor) = self.cursor.take() else {
            return;
        };
        if let Err(e) = cursor.close() {
            warn!(error = %e, "exception while closing cursor");
        }
        debug!(state = ?next, "cursor released");
        self.state = next;
    }
}

impl<C: CursorHandle> Iterator for RowIter<C> {
    type Item = Result<FlatRow, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_row()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<C: CursorHandle> Drop for RowIter<C> {
    fn drop(&mut self) {
        self.release(CursorState::Closed);
    }
}
