//! Configuration sources.
//!
//! # Responsibilities
//! - Define the seam the provider builds from (`ConfigurationSource`)
//! - Build a descriptor from cluster settings (server, credentials, TLS)
//! - Build a mapping from inline resources plus a cached discovery document
//!
//! # Design Decisions
//! - The mapping is derived from the descriptor, never the other way around
//! - Every failure is a `BuildError`; nothing half-built is returned

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::cluster::descriptor::{ConnectionDescriptor, Credentials};
use crate::cluster::error::BuildError;
use crate::cluster::mapping::{ApiLocation, TypeMapping};
use crate::config::schema::{ApiResourceConfig, ClusterConfig, DiscoveryConfig, RuntimeConfig};

/// File name of a cached discovery document inside a per-server directory.
pub const DISCOVERY_DOCUMENT: &str = "resources.json";

/// Supplies the raw material for connection state.
///
/// `type_mapping` receives the descriptor built by `connection_descriptor`.
pub trait ConfigurationSource: Send + Sync {
    fn connection_descriptor(&self) -> Result<ConnectionDescriptor, BuildError>;

    fn type_mapping(&self, descriptor: &ConnectionDescriptor) -> Result<TypeMapping, BuildError>;
}

impl From<ApiResourceConfig> for ApiLocation {
    fn from(config: ApiResourceConfig) -> Self {
        Self {
            group: config.group,
            versions: config.versions,
            kind: config.kind,
            resource: config.resource,
            namespaced: config.namespaced,
        }
    }
}

/// Source backed by the `cluster` and `discovery` configuration sections.
#[derive(Debug, Clone)]
pub struct ClusterSource {
    cluster: ClusterConfig,
    discovery: DiscoveryConfig,
}

impl ClusterSource {
    pub fn new(cluster: ClusterConfig, discovery: DiscoveryConfig) -> Self {
        Self { cluster, discovery }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.cluster.clone(), config.discovery.clone())
    }

    fn server(&self) -> Result<Url, BuildError> {
        let invalid = |reason: String| BuildError::InvalidServer {
            server: self.cluster.server.clone(),
            reason,
        };

        let url = Url::parse(&self.cluster.server).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }

    fn credentials(&self) -> Result<Credentials, BuildError> {
        let cluster = &self.cluster;
        match (&cluster.token, &cluster.username, &cluster.password) {
            (Some(_), Some(_), _) => Err(BuildError::Credentials(
                "token and basic auth are mutually exclusive".to_string(),
            )),
            (Some(token), None, _) if token.is_empty() => {
                Err(BuildError::Credentials("token is empty".to_string()))
            }
            (Some(token), None, _) => Ok(Credentials::Bearer(token.clone())),
            (None, Some(username), Some(password)) => Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, Some(_), None) | (None, None, Some(_)) => Err(BuildError::Credentials(
                "username and password must be set together".to_string(),
            )),
            (None, None, None) => Ok(Credentials::Anonymous),
        }
    }

    fn certificate_authorities(&self) -> Result<Vec<Vec<u8>>, BuildError> {
        let Some(path) = &self.cluster.certificate_authority else {
            return Ok(Vec::new());
        };
        if self.cluster.insecure_skip_tls_verify {
            return Err(BuildError::Tls(
                "a certificate authority cannot be combined with insecure_skip_tls_verify".to_string(),
            ));
        }

        let file = File::open(path).map_err(|e| BuildError::Tls(format!("{}: {}", path, e)))?;
        let certs = rustls_pemfile::certs(&mut BufReader::new(file))
            .map(|cert| cert.map(|der| der.as_ref().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BuildError::Tls(format!("{}: {}", path, e)))?;

        if certs.is_empty() {
            return Err(BuildError::Tls(format!("no certificates found in {}", path)));
        }
        Ok(certs)
    }

    fn discovery_document(&self, descriptor: &ConnectionDescriptor) -> Option<PathBuf> {
        self.discovery.cache_dir.as_ref().map(|dir| {
            Path::new(dir)
                .join(descriptor.host_key())
                .join(DISCOVERY_DOCUMENT)
        })
    }
}

impl ConfigurationSource for ClusterSource {
    fn connection_descriptor(&self) -> Result<ConnectionDescriptor, BuildError> {
        let server = self.server()?;
        let credentials = self.credentials()?;
        let ca_certs = self.certificate_authorities()?;

        let mut descriptor = ConnectionDescriptor::new(server)
            .with_namespace(self.cluster.namespace.clone())
            .with_credentials(credentials);
        descriptor.ca_certs = ca_certs;
        descriptor.insecure_skip_tls_verify = self.cluster.insecure_skip_tls_verify;
        descriptor.timeout = Duration::from_secs(self.cluster.timeout_secs);
        descriptor.http_cache_dir = self.discovery.http_cache_dir.as_ref().map(PathBuf::from);
        if let Some(agent) = &self.cluster.user_agent {
            descriptor.user_agent = agent.clone();
        }

        tracing::debug!(
            server = %descriptor.server,
            namespace = %descriptor.namespace,
            ca_certs = descriptor.ca_certs.len(),
            "Connection descriptor built"
        );
        Ok(descriptor)
    }

    fn type_mapping(&self, descriptor: &ConnectionDescriptor) -> Result<TypeMapping, BuildError> {
        let mapping = TypeMapping::from_locations(
            self.discovery.resources.iter().cloned().map(ApiLocation::from),
        );

        if let Some(path) = self.discovery_document(descriptor) {
            let content = fs::read_to_string(&path)
                .map_err(|e| BuildError::Discovery(format!("{}: {}", path.display(), e)))?;
            let discovered: Vec<ApiResourceConfig> = serde_json::from_str(&content)
                .map_err(|e| BuildError::Discovery(format!("{}: {}", path.display(), e)))?;

            tracing::debug!(
                path = %path.display(),
                resources = discovered.len(),
                "Loaded cached discovery document"
            );
            for resource in discovered {
                mapping.insert(resource.into());
            }
        }

        if mapping.is_empty() {
            return Err(BuildError::EmptyMapping(descriptor.server.to_string()));
        }
        Ok(mapping)
    }
}
