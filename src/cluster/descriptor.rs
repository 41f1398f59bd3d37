//! Connection descriptor.
//!
//! # Responsibilities
//! - Describe how to reach and authenticate to one cluster
//! - Hold the client defaults that a consumer may stamp before issuing calls
//!
//! # Design Decisions
//! - Connection parameters are plain fields, fixed once built
//! - Client defaults live in an `ArcSwap` slot, so stamping them through a
//!   shared `Arc` is visible to every other holder of that `Arc`

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use url::Url;

use crate::cluster::race::RaceDetector;

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Bearer(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Basic {{ username: {:?}, password: <redacted> }}", username)
            }
        }
    }
}

/// Per-client settings a consumer fills in before talking to an API group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDefaults {
    /// Group-version the client targets (e.g. `apps/v1`), if stamped.
    pub group_version: Option<String>,
    /// API path prefix (`/api` for the core group, `/apis` otherwise).
    pub api_path: String,
    /// Content type for request bodies.
    pub content_type: String,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            group_version: None,
            api_path: "/api".to_string(),
            content_type: "application/json".to_string(),
        }
    }
}

/// Everything needed to reach one cluster.
pub struct ConnectionDescriptor {
    /// API server base URL.
    pub server: Url,
    /// Namespace applied to namespaced objects that do not name one.
    pub namespace: String,
    /// Authentication material.
    pub credentials: Credentials,
    /// DER-encoded certificate authorities.
    pub ca_certs: Vec<Vec<u8>>,
    /// Skip server certificate verification.
    pub insecure_skip_tls_verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// HTTP response cache directory, if any.
    pub http_cache_dir: Option<PathBuf>,

    defaults: ArcSwap<ClientDefaults>,
    race_detector: RaceDetector,
}

impl ConnectionDescriptor {
    /// Create a descriptor with default settings for `server`.
    pub fn new(server: Url) -> Self {
        Self {
            server,
            namespace: "default".to_string(),
            credentials: Credentials::Anonymous,
            ca_certs: Vec::new(),
            insecure_skip_tls_verify: false,
            timeout: Duration::from_secs(30),
            user_agent: concat!("cluster-getter/", env!("CARGO_PKG_VERSION")).to_string(),
            http_cache_dir: None,
            defaults: ArcSwap::from_pointee(ClientDefaults::default()),
            race_detector: RaceDetector::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// `host:port` of the API server, used to key per-server caches.
    pub fn host_key(&self) -> String {
        let host = self.server.host_str().unwrap_or_default();
        match self.server.port_or_known_default() {
            Some(port) => format!("{}_{}", host, port),
            None => host.to_string(),
        }
    }

    /// Current client defaults.
    pub fn client_defaults(&self) -> Arc<ClientDefaults> {
        self.defaults.load_full()
    }

    /// Replace the client defaults in place.
    ///
    /// Every holder of the same `Arc<ConnectionDescriptor>` observes the change.
    pub fn store_client_defaults(&self, defaults: ClientDefaults) {
        self.defaults.store(Arc::new(defaults));
    }

    /// Race detection for in-place mutation of this descriptor.
    pub fn race_detector(&self) -> &RaceDetector {
        &self.race_detector
    }
}

impl Clone for ConnectionDescriptor {
    fn clone(&self) -> Self {
        Self {
            server: self.server.clone(),
            namespace: self.namespace.clone(),
            credentials: self.credentials.clone(),
            ca_certs: self.ca_certs.clone(),
            insecure_skip_tls_verify: self.insecure_skip_tls_verify,
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            http_cache_dir: self.http_cache_dir.clone(),
            defaults: ArcSwap::new(self.defaults.load_full()),
            race_detector: RaceDetector::new(),
        }
    }
}

impl PartialEq for ConnectionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.server == other.server
            && self.namespace == other.namespace
            && self.credentials == other.credentials
            && self.ca_certs == other.ca_certs
            && self.insecure_skip_tls_verify == other.insecure_skip_tls_verify
            && self.timeout == other.timeout
            && self.user_agent == other.user_agent
            && self.http_cache_dir == other.http_cache_dir
            && *self.defaults.load() == *other.defaults.load()
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("server", &self.server.as_str())
            .field("namespace", &self.namespace)
            .field("credentials", &self.credentials)
            .field("ca_certs", &self.ca_certs.len())
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("timeout", &self.timeout)
            .field("defaults", &*self.defaults.load())
            .finish()
    }
}
