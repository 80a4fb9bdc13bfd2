mod date;
mod error;
mod transformer;

pub use date::{CANONICAL_FORMAT, DatePattern};
pub use error::TransformError;
pub use transformer::{DateWarning, FieldRule, FieldTransformer};
