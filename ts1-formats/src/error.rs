use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of input while reading {expected}")]
    Truncated { expected: &'static str },

    #[error("trailing data after {format} payload")]
    TrailingData { format: &'static str },

    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("string of {length} bytes does not fit a one-byte length prefix")]
    StringTooLong { length: usize },

    #[error("string {text:?} cannot be encoded as Windows-1252")]
    Unencodable { text: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
