use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Reasons a world file or chunk record is rejected.
///
/// A format error aborts the whole load; no partially decoded world is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A chunk record's guard values are wrong: the data is corrupted or comes from
    /// an unsupported format version.
    BadMagic {
        record: usize,
        found: (u32, u32),
    },
    /// The file length is not a directory plus a whole number of chunk records.
    BadLength {
        length: usize,
        directory_size: usize,
        record_size: usize,
    },
    /// A buffer ended before a fixed-size structure was complete.
    Truncated { needed: usize, available: usize },
}

impl FormatError {
    /// Returns `true` for errors that mean the file has the wrong shape rather than
    /// corrupted contents.
    pub fn is_shape_error(&self) -> bool {
        !matches!(self, FormatError::BadMagic { .. })
    }
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic { record, found } => write!(
                f,
                "Chunk #{} has invalid magic numbers {:#010x}, {:#010x}; the world may be corrupted or from an unsupported version",
                record, found.0, found.1
            ),
            FormatError::BadLength {
                length,
                directory_size,
                record_size,
            } => write!(
                f,
                "Invalid world byte length {}: expected {} directory bytes plus a multiple of {}",
                length, directory_size, record_size
            ),
            FormatError::Truncated { needed, available } => write!(
                f,
                "Buffer too short: needed {} bytes, got {}",
                needed, available
            ),
        }
    }
}

impl Error for FormatError {}

/// A coordinate lookup that did not land on a stored block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// No loaded chunk owns the column at chunk-grid coordinate `(x, z)`.
    NotFound { x: i32, z: i32 },
    /// The Y coordinate is outside `0..256`.
    HeightOutOfRange { y: i32 },
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound { x, z } => write!(f, "No chunk loaded at ({}, {})", x, z),
            LookupError::HeightOutOfRange { y } => write!(f, "Height {} is outside 0..256", y),
        }
    }
}

impl Error for LookupError {}
