//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the getter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::provider::SharePolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How to reach the cluster.
    pub cluster: ClusterConfig,

    /// Where resource type information comes from.
    pub discovery: DiscoveryConfig,

    /// Worker pool settings.
    pub workers: WorkerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Cluster connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// API server URL (e.g., "https://127.0.0.1:6443").
    pub server: String,

    /// Bearer token.
    pub token: Option<String>,

    /// Basic auth username.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// Path to a PEM bundle of certificate authorities.
    pub certificate_authority: Option<String>,

    /// Skip server certificate verification.
    pub insecure_skip_tls_verify: bool,

    /// Default namespace for namespaced objects.
    pub namespace: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent override.
    pub user_agent: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            server: "https://127.0.0.1:6443".to_string(),
            token: None,
            username: None,
            password: None,
            certificate_authority: None,
            insecure_skip_tls_verify: false,
            namespace: "default".to_string(),
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory holding cached discovery documents, one per server.
    pub cache_dir: Option<String>,

    /// Directory for cached HTTP responses.
    pub http_cache_dir: Option<String>,

    /// Resource types known without discovery.
    pub resources: Vec<ApiResourceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            http_cache_dir: None,
            resources: default_resources(),
        }
    }
}

/// One resource type as listed in configuration or a discovery document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ApiResourceConfig {
    /// API group, empty for core.
    #[serde(default)]
    pub group: String,

    /// Served versions, preferred first.
    pub versions: Vec<String>,

    /// Kind name.
    pub kind: String,

    /// Plural resource name.
    pub resource: String,

    /// Whether the kind is namespaced (default: true).
    #[serde(default = "default_namespaced")]
    pub namespaced: bool,
}

fn default_namespaced() -> bool {
    true
}

fn resource(group: &str, version: &str, kind: &str, plural: &str, namespaced: bool) -> ApiResourceConfig {
    ApiResourceConfig {
        group: group.to_string(),
        versions: vec![version.to_string()],
        kind: kind.to_string(),
        resource: plural.to_string(),
        namespaced,
    }
}

fn default_resources() -> Vec<ApiResourceConfig> {
    vec![
        resource("", "v1", "Pod", "pods", true),
        resource("", "v1", "Service", "services", true),
        resource("", "v1", "ConfigMap", "configmaps", true),
        resource("", "v1", "Secret", "secrets", true),
        resource("", "v1", "ServiceAccount", "serviceaccounts", true),
        resource("", "v1", "Namespace", "namespaces", false),
        resource("apps", "v1", "Deployment", "deployments", true),
        resource("apps", "v1", "StatefulSet", "statefulsets", true),
        resource("apps", "v1", "DaemonSet", "daemonsets", true),
    ]
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub parallelism: usize,

    /// Whether workers share cached state or receive copies.
    pub policy: SharePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            parallelism: 2,
            policy: SharePolicy::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
