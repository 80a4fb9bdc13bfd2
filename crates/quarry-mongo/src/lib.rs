mod config;
mod source;

pub use config::{DEFAULT_HOST, DEFAULT_PORT, MongoConfig};
pub use source::{MongoCursor, MongoDataSource};
