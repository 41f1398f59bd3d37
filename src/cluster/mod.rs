//! Cluster connection state.
//!
//! # Data Flow
//! ```text
//! RuntimeConfig (cluster + discovery sections)
//!     → source.rs (ClusterSource: ConfigurationSource)
//!     → descriptor.rs (ConnectionDescriptor: how to reach the cluster)
//!     → mapping.rs (TypeMapping: kind → API location, derived from the descriptor)
//!     → handed to the provider, which caches and hands out both
//! ```
//!
//! # Design Decisions
//! - The descriptor is built first; the mapping needs it (discovery is per server)
//! - Both carry a race.rs RaceDetector so unsynchronized in-place mutation is detectable
//! - Clones are deep and get a fresh detector

pub mod descriptor;
pub mod error;
pub mod mapping;
pub mod race;
pub mod source;

pub use descriptor::{ClientDefaults, ConnectionDescriptor, Credentials};
pub use error::{BuildError, RaceDetected};
pub use mapping::{ApiLocation, TypeMapping};
pub use race::{MutationGuard, MutatorId, RaceDetector};
pub use source::{ClusterSource, ConfigurationSource};
