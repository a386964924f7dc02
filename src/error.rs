//! # Error Handling
//!
//! This module defines the error type shared by every stage of a
//! reconciliation run. It uses `thiserror` so each variant carries its own
//! message format and the binary can print errors without extra wrapping.
//!
//! ## Fatal conditions
//!
//! - **`Conflict`**: one key declared with two different values. The run
//!   aborts before anything is written.
//! - **`MissingFile`**: no compose manifest where one is required. A missing
//!   dot-file is never an error, it is treated as an empty baseline.
//! - **`MalformedInput`**: a value where a line or record was expected that
//!   cannot be represented (non-string manifest items, `=value` lines).
//! - **`UnsupportedMode`**: a capability the CLI reserves but the tool does
//!   not implement yet (single compose file mode).
//!
//! None of these are retried. They propagate to the command boundary, which
//! turns them into a message on stderr and a non-zero exit code.

use thiserror::Error;

/// Main error type for extract-env operations
#[derive(Error, Debug)]
pub enum Error {
    /// A key is declared more than once with values that disagree.
    #[error("Conflicting values for '{key}': '{first}' != '{second}'")]
    Conflict {
        key: String,
        first: String,
        second: String,
    },

    /// A required input file does not exist.
    #[error("File not found: {path}")]
    MissingFile { path: String },

    /// Input that cannot be turned into an environment record.
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// A requested mode that is not implemented.
    #[error("Not yet supported: {feature}")]
    UnsupportedMode { feature: String },

    /// The manifest was readable YAML but not shaped like a compose file.
    #[error("Invalid manifest '{path}': {message}")]
    Manifest { path: String, message: String },

    /// Staging or committing output files failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
