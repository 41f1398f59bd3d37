//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stderr (fmt layer, filtered by RUST_LOG or the configured level)
//!     → whatever metrics recorder the embedding process installs
//! ```
//!
//! # Design Decisions
//! - Structured fields (policy, worker, target) rather than formatted strings
//! - Metrics are cheap (atomic increments) and no-ops without a recorder
//! - No exporter is installed by this crate

pub mod logging;
pub mod metrics;
