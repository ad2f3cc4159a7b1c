//! Error types for Themis.
//!
//! Library crates use [`ThemisError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::fmt::Display;
use std::path::PathBuf;

/// Top-level error type for all Themis operations.
#[derive(Debug, thiserror::Error)]
pub enum ThemisError {
    /// Listing the children of a page failed.
    #[error("fetch error at {url}: {message}")]
    Fetch { url: String, message: String },

    /// A recursive descent below `name` failed.
    #[error("failed to build subtree {name} ({url}): {source}")]
    Build {
        name: String,
        url: String,
        source: Box<ThemisError>,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing a record stream to a caller-supplied sink failed.
    #[error("record stream write failed: {0}")]
    Stream(#[source] std::io::Error),

    /// A node record could not be serialized.
    #[error("failed to encode node {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    /// A persisted record stream is malformed or inconsistent.
    #[error("decode error at line {line}: {message}")]
    Decode { line: usize, message: String },

    /// A persisted tree file holds no records at all.
    #[error("no records in {path:?}")]
    NoRecords { path: PathBuf },

    /// Network/HTTP error inside the portal client.
    #[error("network error: {0}")]
    Network(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Structural misuse of an assignment tree.
    #[error("tree error: {message}")]
    Tree { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ThemisError>;

impl ThemisError {
    /// Wrap any failure raised while listing `url`.
    pub fn fetch(url: impl Into<String>, cause: impl Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: cause.to_string(),
        }
    }

    /// Wrap a failure from the subtree rooted at `name`.
    pub fn build(name: impl Into<String>, url: impl Into<String>, source: ThemisError) -> Self {
        Self::Build {
            name: name.into(),
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Create a decode error for a 1-based line number.
    pub fn decode(line: usize, msg: impl Into<String>) -> Self {
        Self::Decode {
            line,
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a tree error from any displayable message.
    pub fn tree(msg: impl Into<String>) -> Self {
        Self::Tree {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
