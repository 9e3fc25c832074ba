use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

use crate::config::ConfigError;
use crate::task_management::OffloadError;
use crate::voxels::error::{FormatError, LookupError};

/// Any failure an editor command can end with.
#[derive(Debug)]
pub enum EditorError {
    Format(FormatError),
    Lookup(LookupError),
    Offload(OffloadError),
    Config(ConfigError),
    Io(io::Error),
    /// Bad command line.
    Usage(String),
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::Format(e) => write!(f, "{}", e),
            EditorError::Lookup(e) => write!(f, "{}", e),
            EditorError::Offload(e) => write!(f, "Scan failed: {}", e),
            EditorError::Config(e) => write!(f, "{}", e),
            EditorError::Io(e) => write!(f, "I/O error: {}", e),
            EditorError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EditorError::Format(e) => Some(e),
            EditorError::Lookup(e) => Some(e),
            EditorError::Offload(e) => Some(e),
            EditorError::Config(e) => Some(e),
            EditorError::Io(e) => Some(e),
            EditorError::Usage(_) => None,
        }
    }
}

impl From<FormatError> for EditorError {
    fn from(e: FormatError) -> Self {
        EditorError::Format(e)
    }
}

impl From<LookupError> for EditorError {
    fn from(e: LookupError) -> Self {
        EditorError::Lookup(e)
    }
}

impl From<OffloadError> for EditorError {
    fn from(e: OffloadError) -> Self {
        EditorError::Offload(e)
    }
}

impl From<ConfigError> for EditorError {
    fn from(e: ConfigError) -> Self {
        EditorError::Config(e)
    }
}

impl From<io::Error> for EditorError {
    fn from(e: io::Error) -> Self {
        EditorError::Io(e)
    }
}
