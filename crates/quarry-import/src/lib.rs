mod cursor;
mod error;
mod iter;
mod memory;
mod request;

pub use cursor::{CursorHandle, DocumentSource};
pub use error::{BoxError, ImportError};
pub use iter::{CursorState, RowIter};
pub use memory::{MemoryCursor, MemorySource};
pub use quarry_doc::{FlatRow, FlattenMode};
pub use request::QueryRequest;
