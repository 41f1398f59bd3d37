//! Connection state provider.
//!
//! # Data Flow
//! ```text
//! First caller (any number may arrive at once)
//!     → config_provider.rs: slot Empty → Building, one build task spawned
//!     → ConfigurationSource builds descriptor, then mapping
//!     → slot Ready (or back to Empty on failure), outcome sent to every waiter
//!
//! Every caller
//!     → cached (descriptor, mapping)
//!     → Handout strategy chosen by SharePolicy:
//!         - share.rs (same Arc for everyone)
//!         - clone.rs (fresh deep copy per call)
//! ```
//!
//! # Design Decisions
//! - State is owned by the provider instance, never global
//! - The policy is frozen into the cached state when the build starts;
//!   changing it afterwards is rejected
//! - Readers after the build take a lock-free fast path

pub mod clone;
pub mod config_provider;
pub mod policy;
pub mod share;

use std::fmt::Debug;
use std::sync::Arc;

use crate::cluster::{ConnectionDescriptor, TypeMapping};

pub use config_provider::{ConfigProvider, PolicyError};
pub use policy::SharePolicy;

/// How cached state is handed to a caller.
pub trait Handout: Debug + Send + Sync {
    fn descriptor(&self, cached: &Arc<ConnectionDescriptor>) -> Arc<ConnectionDescriptor>;

    fn mapping(&self, cached: &Arc<TypeMapping>) -> Arc<TypeMapping>;
}
