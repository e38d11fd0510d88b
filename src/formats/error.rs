//! Error and warning types shared by all decoders.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Every variant is fatal for the decode call that raised it and for that
/// call only; results produced by earlier calls are never affected.
#[derive(Debug, Error)]
pub enum FlError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not conform to the expected byte layout: bad magic,
    /// truncated structure, or an unrecognized tag the stream cannot be
    /// resynchronized past.
    #[error("invalid {format} data: {reason}")]
    InvalidFormat {
        format: &'static str,
        reason: String,
    },

    /// A format carried a version number this crate does not understand.
    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion { format: &'static str, version: u32 },

    /// A string-table pointer does not land on any string in the pool.
    ///
    /// BINI addresses its string pool by byte offset, so a pointer is only
    /// valid if it equals the starting offset of some pooled string.
    #[error("dangling string table pointer: {offset:#x}")]
    DanglingPointer { offset: u32 },

    /// No entry with the requested name exists in an asset tree.
    #[error("no entry named '{0}' in asset tree")]
    EntryNotFound(String),

    /// A required PE section is missing from the image.
    #[error("section '{0}' not found in PE image")]
    SectionNotFound(&'static str),

    /// A resource type this reader cannot decode. The directory cannot be
    /// skipped past safely without knowing the type-specific leaf layout.
    #[error("unsupported resource type: {0:#x}")]
    UnsupportedResourceType(u32),

    /// Rich-text markup that is not well-formed after tag substitution.
    #[error("malformed rich-text markup: {0}")]
    MalformedMarkup(String),
}

/// A convenience `Result` type alias using the crate's `FlError` type.
pub type Result<T> = std::result::Result<T, FlError>;

/// A recoverable problem in a text configuration file.
///
/// Malformed entry lines do not abort the decode; the offending line is
/// skipped and a `Warning` is collected instead, so callers can log them
/// and proceed with the partial document (mod data is routinely sloppy and
/// the game itself shrugs these lines off).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Source file, when the input came from a path rather than a buffer.
    pub path: Option<PathBuf>,
    /// 1-based line number of the skipped line.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}: {}", path.display(), self.line, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}
