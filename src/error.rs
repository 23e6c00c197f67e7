use std::path::PathBuf;

/// Result type alias for fatal generation errors
pub type Result<T> = std::result::Result<T, Error>;

/// Conditions that abort a generation run
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    /// Two declarations share one qualified name
    Redeclaration {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    SerializationError(String),
    OverrideError { file: PathBuf, message: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "parse error in {}: {}", file.display(), message)
            }
            Error::Redeclaration {
                name,
                first,
                second,
            } => write!(
                f,
                "redeclaration of {} in {} (first declared in {})",
                name,
                second.display(),
                first.display()
            ),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
            Error::OverrideError { file, message } => {
                write!(f, "invalid override document {}: {}", file.display(), message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}
