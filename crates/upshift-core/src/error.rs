//! Error types for upshift-core

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A user-supplied option failed validation before any task ran.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// The requested prerelease is not a valid semver prerelease.
    #[error("invalid prerelease '{value}': {reason}")]
    Prerelease {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested build metadata is not valid semver metadata.
    #[error("invalid build metadata '{value}': {reason}")]
    Metadata {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown changelog sort order.
    #[error("invalid sort order '{0}', expected one of: asc, desc")]
    Sort(String),

    /// Unknown tag sort order.
    #[error("invalid tag sort '{0}', expected one of: version, date")]
    TagSort(String),

    /// A changelog include/exclude pattern is not a valid regex.
    #[error("invalid pattern '{pattern}': {reason}")]
    Pattern {
        /// The rejected pattern.
        pattern: String,
        /// Compiler error.
        reason: String,
    },
}

/// Result type alias using [`ValidationError`].
pub type ValidationResult<T> = Result<T, ValidationError>;
