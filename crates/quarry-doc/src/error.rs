#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("index {index} out of range for `{path}` (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("segment `{segment}` of `{path}` is not an array index")]
    InvalidIndex { path: String, segment: String },

    #[error("`{path}` nests deeper than {limit} levels")]
    TooDeep { path: String, limit: usize },
}
