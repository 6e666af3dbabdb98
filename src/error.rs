//! Error types for string generation, file materialisation and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building an alphabet or drawing unique strings from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// The selected character classes produced fewer than two distinct symbols.
    #[error("alphabet needs at least 2 distinct characters, got {size}")]
    InvalidAlphabet {
        /// Number of distinct characters that were available.
        size: usize,
    },

    /// No further unique value of this length could be produced.
    #[error(
        "exhausted unique strings of length {length} after {attempts} attempts ({issued} already issued)"
    )]
    ExhaustedUniqueSpace {
        /// Requested string length.
        length: usize,
        /// Values this generator had already handed out.
        issued: usize,
        /// Draws made before giving up.
        attempts: usize,
    },
}

/// Failures of a materialisation run.
///
/// Files written before the failure stay on disk.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(
        "not enough free space: {required} bytes required, {available} available with a {margin} byte safety margin"
    )]
    InsufficientSpace {
        required: u64,
        available: u64,
        margin: u64,
    },

    #[error("invalid file spec: {reason}")]
    InvalidFileSpec { reason: String },

    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run cancelled after {created} files")]
    Cancelled { created: u64 },
}

/// Errors from loading settings or resolving command-line values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid size '{value}'")]
    InvalidSize { value: String },

    #[error("invalid file count '{value}': {reason}")]
    InvalidCount { value: String, reason: &'static str },
}
