//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use cluster_getter::cluster::{BuildError, ClusterSource, ConfigurationSource, ConnectionDescriptor, TypeMapping};
use cluster_getter::config::{ApiResourceConfig, RuntimeConfig};

/// Three well-formed resource documents.
pub const MANIFEST: &str = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  mode: fast
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
spec:
  replicas: 2
---
apiVersion: v1
kind: Service
metadata:
  name: web
";

/// Stub configuration pointing at a cluster that is never contacted.
pub fn stub_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.cluster.server = "https://cluster.test:6443".to_string();
    config.cluster.token = Some("stub-token".to_string());
    config.cluster.namespace = "apps".to_string();
    config
}

/// Stub configuration with one kind whose entry normalization rewrites.
pub fn unnormalized_config() -> RuntimeConfig {
    let mut config = stub_config();
    config.discovery.resources.push(ApiResourceConfig {
        group: "example.io".to_string(),
        versions: vec!["v2".to_string(), "v1".to_string()],
        kind: "Widget".to_string(),
        resource: "Widgets".to_string(),
        namespaced: true,
    });
    config
}

/// Write `text` to a temporary manifest file.
pub fn manifest_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

/// Blocks builders until opened.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

/// `ClusterSource` that counts how often each half is built.
pub struct CountingSource {
    inner: ClusterSource,
    /// Pause between building the descriptor and the mapping.
    pub delay: Duration,
    pub gate: Option<Gate>,
    descriptors: AtomicUsize,
    mappings: AtomicUsize,
}

impl CountingSource {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            inner: ClusterSource::from_config(config),
            delay: Duration::ZERO,
            gate: None,
            descriptors: AtomicUsize::new(0),
            mappings: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Gate::default());
        self
    }

    pub fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.open();
        }
    }

    pub fn descriptor_builds(&self) -> usize {
        self.descriptors.load(Ordering::SeqCst)
    }

    pub fn mapping_builds(&self) -> usize {
        self.mappings.load(Ordering::SeqCst)
    }
}

impl ConfigurationSource for CountingSource {
    fn connection_descriptor(&self) -> Result<ConnectionDescriptor, BuildError> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        self.descriptors.fetch_add(1, Ordering::SeqCst);
        let descriptor = self.inner.connection_descriptor()?;
        std::thread::sleep(self.delay);
        Ok(descriptor)
    }

    fn type_mapping(&self, descriptor: &ConnectionDescriptor) -> Result<TypeMapping, BuildError> {
        let mapping = self.inner.type_mapping(descriptor)?;
        self.mappings.fetch_add(1, Ordering::SeqCst);
        Ok(mapping)
    }
}

/// Source whose descriptor build always fails once its gate opens.
#[derive(Default)]
pub struct FailingSource {
    pub gate: Gate,
    attempts: AtomicUsize,
}

impl FailingSource {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ConfigurationSource for FailingSource {
    fn connection_descriptor(&self) -> Result<ConnectionDescriptor, BuildError> {
        self.gate.wait();
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BuildError::Credentials("token rejected".to_string()))
    }

    fn type_mapping(&self, _: &ConnectionDescriptor) -> Result<TypeMapping, BuildError> {
        Err(BuildError::Discovery("not reached".to_string()))
    }
}
