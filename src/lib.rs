//! Lazily built, shared cluster connection state for concurrent manifest workers

pub mod cluster;
pub mod config;
pub mod manifest;
pub mod observability;
pub mod provider;
pub mod worker;

pub use cluster::{BuildError, ClusterSource, ConfigurationSource, ConnectionDescriptor, TypeMapping};
pub use config::RuntimeConfig;
pub use manifest::{ManifestError, ResourceBuilder, ResourceInfo};
pub use provider::{ConfigProvider, SharePolicy};
pub use worker::{ManifestTask, PoolReport, WorkerPool};
