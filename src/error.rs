//! Error types for geotiff-decode
//!
//! Every error records the component and operation it came from, so a failure
//! deep inside block decoding still reads as `samples::decode_region: ...` by
//! the time it reaches the caller.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type for geotiff-decode operations
pub type Result<T> = std::result::Result<T, Error>;

/// Where an error originated: the decoding component and the operation in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub component: &'static str,
    pub operation: &'static str,
}

impl Context {
    pub const fn new(component: &'static str, operation: &'static str) -> Self {
        Self { component, operation }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.operation)
    }
}

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Failed or short reads from the byte source
    Io,
    /// Malformed structural encoding
    Format,
    /// Well-formed bytes describing inconsistent metadata
    Validation,
}

/// Error types that can occur while decoding a GeoTIFF
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer bytes were available than requested
    #[error("[{context}] short read at offset {offset}: requested {requested} bytes, got {actual}")]
    ShortRead {
        context: Context,
        offset: u64,
        requested: usize,
        actual: usize,
    },

    /// Underlying I/O failure
    #[error("[{context}] I/O error: {source}")]
    Io {
        context: Context,
        #[source]
        source: io::Error,
    },

    /// Malformed structural encoding
    #[error("[{context}] format error: {message}")]
    Format { context: Context, message: String },

    /// One or more required tags are absent
    #[error("[{context}] missing required tags: {}", format_tags(.tags))]
    MissingTags { context: Context, tags: Vec<u16> },

    /// Semantically invalid metadata
    #[error("[{context}] validation error: {message}")]
    Validation { context: Context, message: String },
}

fn format_tags(tags: &[u16]) -> String {
    tags.iter()
        .map(|&tag| format!("{} ({})", crate::formats::tiff::tags::tag_name(tag), tag))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn format(context: Context, message: impl Into<String>) -> Self {
        Error::Format { context, message: message.into() }
    }

    pub fn validation(context: Context, message: impl Into<String>) -> Self {
        Error::Validation { context, message: message.into() }
    }

    pub fn io(context: Context, source: io::Error) -> Self {
        Error::Io { context, source }
    }

    pub fn short_read(context: Context, offset: u64, requested: usize, actual: usize) -> Self {
        Error::ShortRead { context, offset, requested, actual }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShortRead { .. } | Error::Io { .. } => ErrorKind::Io,
            Error::Format { .. } | Error::MissingTags { .. } => ErrorKind::Format,
            Error::Validation { .. } => ErrorKind::Validation,
        }
    }

    pub fn context(&self) -> Context {
        match self {
            Error::ShortRead { context, .. }
            | Error::Io { context, .. }
            | Error::Format { context, .. }
            | Error::MissingTags { context, .. }
            | Error::Validation { context, .. } => *context,
        }
    }
}
