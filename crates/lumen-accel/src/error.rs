//! Error types for the acceleration core.
//!
//! Tracing itself never fails; errors only arise at the configuration
//! boundary, before any structure is built.

use thiserror::Error;

/// Errors that can occur while configuring acceleration structures.
#[derive(Error, Debug)]
pub enum AccelError {
    /// Build settings are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Build settings could not be parsed.
    #[error("failed to parse settings: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for acceleration core operations.
pub type Result<T> = std::result::Result<T, AccelError>;
