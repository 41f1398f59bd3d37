//! Parsed resource types and manifest errors.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cluster::{ApiLocation, RaceDetected};

/// One resource object resolved against the type mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInfo {
    /// Name of the manifest source the object came from.
    pub source: String,
    /// Zero-based document index within the source.
    pub document: usize,
    pub name: String,
    /// Target namespace; `None` for cluster-scoped kinds.
    pub namespace: Option<String>,
    pub api_version: String,
    pub kind: String,
    /// Where the kind is served.
    pub location: ApiLocation,
    /// The decoded object, with namespace defaulting applied.
    pub object: Value,
}

/// Errors that can occur while reading or validating manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {source_name}: {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// The bytes are not a structured document.
    #[error("{source_name} document {document}: parse error: {message}")]
    Parse {
        source_name: String,
        document: usize,
        message: String,
    },

    /// The document is well-formed but not a usable resource.
    #[error("{source_name} document {document}: {message}")]
    Validation {
        source_name: String,
        document: usize,
        message: String,
    },

    #[error(transparent)]
    Race(#[from] RaceDetected),

    /// Every error collected in continue-on-error mode.
    #[error("{} errors: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<ManifestError>),
}

fn join_errors(errors: &[ManifestError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;
