//! Manifest processing pipeline.
//!
//! # Data Flow
//! ```text
//! manifest source (file, stream, text)
//!     → decode.rs (multi-document YAML/JSON → JSON values)
//!     → builder.rs (flatten lists, validate, resolve kind via TypeMapping,
//!                   default namespace from ConnectionDescriptor)
//!     → types.rs (ResourceInfo per object, or ManifestError)
//! ```
//!
//! # Design Decisions
//! - Safe to run concurrently on shared descriptor/mapping as long as
//!   `normalize_mapping` is off; with it on the builder mutates its inputs
//! - Documents keep their index in the source for error reporting

pub mod builder;
pub mod decode;
pub mod types;

pub use builder::ResourceBuilder;
pub use types::{ManifestError, ManifestResult, ResourceInfo};
