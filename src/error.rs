//! Diagnostic error types for fabula.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives.
//! Only failures that should stop the caller live here: unreadable or malformed
//! persisted state, bad configuration, unusable input files. A term missing from
//! the semantic network or a story that fails validation is an ordinary result,
//! not an error.

use miette::Diagnostic;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::paths::PathError;

/// Top-level error type for fabula.
#[derive(Debug, Error, Diagnostic)]
pub enum FabulaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error on {path}")]
    #[diagnostic(
        code(fabula::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed persisted file {path}: {message}")]
    #[diagnostic(
        code(fabula::store::malformed),
        help(
            "The file is not valid JSON for its record type. Fix or remove it; \
             stories can be re-imported from their source text."
        )
    )]
    Malformed { path: String, message: String },

    #[error("failed to serialize {what}: {message}")]
    #[diagnostic(code(fabula::store::serialize))]
    Serialization { what: String, message: String },

    #[error("story has no id")]
    #[diagnostic(
        code(fabula::store::missing_id),
        help("Every story needs a non-empty id before it can be stored.")
    )]
    MissingStoryId,

    #[error("story not found: {id}")]
    #[diagnostic(
        code(fabula::store::story_not_found),
        help("List the stored stories with `fabula list`.")
    )]
    StoryNotFound { id: String },
}

// ---------------------------------------------------------------------------
// Import errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("cannot read input file {path}")]
    #[diagnostic(
        code(fabula::import::read),
        help("Check that the file exists and is readable UTF-8 text.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no stories found in {path}")]
    #[diagnostic(
        code(fabula::import::empty),
        help(
            "A story starts with a domain line (no brackets) followed by tagged lines \
             such as `[sujet] chat [predicat] manger`."
        )
    )]
    Empty { path: String },
}

/// Convenience alias for functions returning fabula results.
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;

/// Result type for knowledge store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
