//! Error types for the Savannah workspace.

use thiserror::Error;

/// Top-level error type for Savannah load and setup operations.
///
/// The simulation itself never fails at runtime; errors only surface where
/// data crosses into the process (config files, profiles, reports).
#[derive(Debug, Error)]
pub enum SavannahError {
    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced region does not exist in the scenario
    #[error("unknown region: {0}")]
    UnknownRegion(String),
}

/// Result type alias for Savannah operations.
pub type SavannahResult<T> = Result<T, SavannahError>;
