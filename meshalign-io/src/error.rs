//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub fn parse(message: impl Into<String>) -> Self {
        IoError::ParseError {
            message: message.into(),
        }
    }
}

impl From<IoError> for meshalign_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::FileNotFound { path } => meshalign_core::Error::FileNotFound { path },
            IoError::InvalidFormat { format } => meshalign_core::Error::UnsupportedFormat(format),
            IoError::ParseError { message } => meshalign_core::Error::Parse(message),
            IoError::WriteError { message } => {
                meshalign_core::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, message))
            }
            IoError::Io(e) => meshalign_core::Error::Io(e),
        }
    }
}
