//! Concurrent workers.
//!
//! # Data Flow
//! ```text
//! WorkerPool::run(provider, task)
//!     → pool.rs spawns N workers (tokio tasks, no ordering between them)
//!     → each worker: provider.connection_descriptor() + provider.type_mapping()
//!     → task(WorkerContext), e.g. task.rs ManifestTask → ResourceBuilder
//!     → report.rs collects every outcome once all workers are done
//! ```
//!
//! # Design Decisions
//! - Independent completion: failures and panics are collected, never propagated
//! - Outcomes are reported by worker index, not completion order
//! - One run ID per pool run for log correlation

pub mod pool;
pub mod report;
pub mod task;

pub use pool::{WorkerContext, WorkerPool};
pub use report::{PoolReport, WorkerError, WorkerOutcome};
pub use task::{BuilderOptions, ManifestTask, ParsedManifest};
