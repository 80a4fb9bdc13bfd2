use quarry_doc::PathError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure surfaced to whoever drives an import.
///
/// Everything that aborts an import is `Severe`: bad configuration, a query
/// that will not parse, a cursor that failed mid-stream. Field-level
/// problems never reach this type; they are logged and the field is nulled.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{message}")]
    Severe {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The pull contract was broken, e.g. `next_row` on a finished iterator.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
}

impl ImportError {
    pub fn severe(message: impl Into<String>) -> Self {
        ImportError::Severe {
            message: message.into(),
            source: None,
        }
    }

    pub fn wrap(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ImportError::Severe {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn is_severe(&self) -> bool {
        matches!(self, ImportError::Severe { .. })
    }
}

impl From<PathError> for ImportError {
    fn from(e: PathError) -> Self {
        ImportError::wrap("failed to materialize row", e)
    }
}
