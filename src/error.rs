pub type Result<T> = std::result::Result<T, AlignError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignError {
    #[error("malformed cell on line {line}: no closing `{delimiter}` after byte {column}")]
    MalformedCell {
        line: usize,
        column: usize,
        delimiter: char,
    },

    #[error("no render surface available to measure glyphs")]
    NoRenderSurface,

    #[error("position {position} is not inside a table")]
    NotATable { position: usize },

    #[error("invalid charset `{name}`: {reason}")]
    InvalidCharset { name: String, reason: String },
}
