//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → RuntimeConfig (validated, immutable)
//!     → cluster::ClusterSource (the provider's configuration source)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::RuntimeConfig;
pub use schema::ClusterConfig;
pub use schema::DiscoveryConfig;
pub use schema::ApiResourceConfig;
pub use schema::WorkerConfig;
