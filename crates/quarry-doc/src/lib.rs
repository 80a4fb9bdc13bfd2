mod error;
mod node;
mod path;
mod row;

pub use bson::{Bson, Document};
pub use error::PathError;
pub use node::Node;
pub use path::{MAX_DEPTH, leaf_paths, resolve};
pub use row::{FlatRow, FlattenMode, materialize};
