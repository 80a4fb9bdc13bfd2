/// A field rule set that cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("unsupported pattern letter `{letter}` in date format `{pattern}`")]
    UnsupportedLetter { pattern: String, letter: char },

    #[error("unterminated quote in date format `{pattern}`")]
    UnterminatedQuote { pattern: String },

    #[error("empty date format for column `{column}`")]
    EmptyPattern { column: String },
}
