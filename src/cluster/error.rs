//! Errors raised while building or using cluster connection state.

use thiserror::Error;

/// Errors that can occur while building a descriptor or mapping.
///
/// `Clone` so that one failed build can be delivered to every caller
/// that was waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// Server address is missing or malformed.
    #[error("invalid server '{server}': {reason}")]
    InvalidServer { server: String, reason: String },

    /// Credentials are incomplete or contradictory.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Certificate authority could not be read or parsed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Discovery data could not be read.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Discovery produced no resource types.
    #[error("discovery returned no resource types for {0}")]
    EmptyMapping(String),

    /// Any other failure reported by a configuration source.
    #[error("configuration source error: {0}")]
    Source(String),

    /// The build task ended without producing a result.
    #[error("build abandoned before completion")]
    Abandoned,
}

/// Two holders mutated the same shared object at the same time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("race detected: concurrent in-place mutation of shared {target}")]
pub struct RaceDetected {
    pub target: &'static str,
}
