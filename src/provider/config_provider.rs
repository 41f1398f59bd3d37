//! Build-once provider of connection state.
//!
//! # Responsibilities
//! - Build (descriptor, mapping) from a `ConfigurationSource` at most once
//! - Coordinate concurrent first callers onto that single build
//! - Deliver a failed build to every caller that waited on it
//! - Hand out cached state through the configured `Handout` strategy
//! - Optionally skip the cache and build fresh state on every call

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::watch;

use crate::cluster::{BuildError, ConfigurationSource, ConnectionDescriptor, TypeMapping};
use crate::observability::metrics;
use crate::provider::{Handout, SharePolicy};

/// Errors from changing provider settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The cache is built (or being built) with another policy.
    #[error("policy is locked to {current} once the cache is in use (requested {requested})")]
    Locked {
        current: SharePolicy,
        requested: SharePolicy,
    },
}

type BuildOutcome = Result<Arc<ClusterState>, BuildError>;

/// Fully built connection state plus the strategy it is handed out with.
#[derive(Debug)]
struct ClusterState {
    descriptor: Arc<ConnectionDescriptor>,
    mapping: Arc<TypeMapping>,
    policy: SharePolicy,
    handout: Box<dyn Handout>,
}

enum Slot {
    Empty,
    Building(watch::Receiver<Option<BuildOutcome>>),
    Ready(Arc<ClusterState>),
}

struct Inner {
    policy: SharePolicy,
    slot: Slot,
}

struct Shared {
    source: Arc<dyn ConfigurationSource>,
    inner: Mutex<Inner>,
    /// Published copy of `Slot::Ready` for lock-free reads.
    ready: ArcSwapOption<ClusterState>,
    builds: AtomicU64,
    /// When false every call builds its own state and the slot stays empty.
    cached: bool,
}

/// Lazily builds connection state once and hands it to any number of callers.
///
/// Cloning the provider yields another handle to the same cache.
#[derive(Clone)]
pub struct ConfigProvider {
    shared: Arc<Shared>,
}

impl ConfigProvider {
    /// Create a provider over `source` with the given policy.
    pub fn new<S>(source: S, policy: SharePolicy) -> Self
    where
        S: ConfigurationSource + 'static,
    {
        Self::from_source(Arc::new(source), policy)
    }

    /// Create a provider over an already shared source.
    pub fn from_source(source: Arc<dyn ConfigurationSource>, policy: SharePolicy) -> Self {
        Self::with_caching(source, policy, true)
    }

    /// Create a provider that builds fresh state from `source` on every call.
    ///
    /// Nothing is shared between callers, so no policy applies.
    pub fn uncached<S>(source: S) -> Self
    where
        S: ConfigurationSource + 'static,
    {
        Self::uncached_from_source(Arc::new(source))
    }

    /// Uncached provider over an already shared source.
    pub fn uncached_from_source(source: Arc<dyn ConfigurationSource>) -> Self {
        Self::with_caching(source, SharePolicy::ShareByReference, false)
    }

    fn with_caching(source: Arc<dyn ConfigurationSource>, policy: SharePolicy, cached: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                inner: Mutex::new(Inner {
                    policy,
                    slot: Slot::Empty,
                }),
                ready: ArcSwapOption::empty(),
                builds: AtomicU64::new(0),
                cached,
            }),
        }
    }

    /// Current policy.
    pub fn policy(&self) -> SharePolicy {
        self.shared.lock().policy
    }

    /// Change the policy. Only allowed while nothing has been built or is building.
    pub fn set_policy(&self, policy: SharePolicy) -> Result<(), PolicyError> {
        let mut guard = self.shared.lock();
        let inner = &mut *guard;
        if inner.policy == policy {
            return Ok(());
        }
        match inner.slot {
            Slot::Empty => {
                inner.policy = policy;
                Ok(())
            }
            Slot::Building(_) | Slot::Ready(_) => Err(PolicyError::Locked {
                current: inner.policy,
                requested: policy,
            }),
        }
    }

    /// Whether built state is kept and reused.
    pub fn is_cached(&self) -> bool {
        self.shared.cached
    }

    /// Whether the cache holds built state.
    pub fn is_built(&self) -> bool {
        self.shared.ready.load().is_some()
    }

    /// Number of builds started over the provider's lifetime.
    pub fn build_count(&self) -> u64 {
        self.shared.builds.load(Ordering::Acquire)
    }

    /// Connection descriptor, building the cache if needed.
    pub async fn connection_descriptor(&self) -> Result<Arc<ConnectionDescriptor>, BuildError> {
        let state = self.state().await?;
        metrics::record_handout(state.policy);
        Ok(state.handout.descriptor(&state.descriptor))
    }

    /// Type mapping, building the cache if needed.
    pub async fn type_mapping(&self) -> Result<Arc<TypeMapping>, BuildError> {
        let state = self.state().await?;
        metrics::record_handout(state.policy);
        Ok(state.handout.mapping(&state.mapping))
    }

    async fn state(&self) -> Result<Arc<ClusterState>, BuildError> {
        if !self.shared.cached {
            let shared = self.shared.clone();
            let policy = self.policy();
            return tokio::task::spawn_blocking(move || shared.build_uncached(policy))
                .await
                .unwrap_or(Err(BuildError::Abandoned));
        }

        if let Some(state) = self.shared.ready.load_full() {
            return Ok(state);
        }

        let mut rx = {
            let mut guard = self.shared.lock();
            let inner = &mut *guard;
            match &inner.slot {
                Slot::Ready(state) => return Ok(state.clone()),
                Slot::Building(rx) => rx.clone(),
                Slot::Empty => {
                    let (tx, rx) = watch::channel(None);
                    inner.slot = Slot::Building(rx.clone());

                    // Detached so that a cancelled caller cannot abandon the build.
                    let shared = self.shared.clone();
                    let policy = inner.policy;
                    tokio::task::spawn_blocking(move || shared.build_and_publish(policy, tx));
                    rx
                }
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(BuildError::Abandoned))
    }
}

impl std::fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("policy", &self.policy())
            .field("cached", &self.is_cached())
            .field("built", &self.is_built())
            .field("builds", &self.build_count())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build(&self, policy: SharePolicy) -> BuildOutcome {
        let descriptor = self.source.connection_descriptor()?;
        let mapping = self.source.type_mapping(&descriptor)?;

        Ok(Arc::new(ClusterState {
            descriptor: Arc::new(descriptor),
            mapping: Arc::new(mapping),
            policy,
            handout: policy.handout(),
        }))
    }

    fn build_uncached(&self, policy: SharePolicy) -> BuildOutcome {
        self.builds.fetch_add(1, Ordering::AcqRel);
        tracing::debug!("Building uncached connection state");

        let outcome = self.build(policy);
        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Failed to build connection state");
        }
        metrics::record_build(outcome.is_ok());
        outcome
    }

    fn build_and_publish(&self, policy: SharePolicy, tx: watch::Sender<Option<BuildOutcome>>) {
        let reset = ResetOnUnwind {
            shared: self,
            armed: true,
        };
        self.builds.fetch_add(1, Ordering::AcqRel);
        tracing::info!(policy = %policy, "Building connection state");

        let started = Instant::now();
        let outcome = self.build(policy);

        {
            let mut inner = self.lock();
            inner.slot = match &outcome {
                Ok(state) => {
                    self.ready.store(Some(state.clone()));
                    Slot::Ready(state.clone())
                }
                Err(_) => Slot::Empty,
            };
        }
        reset.disarm();

        match &outcome {
            Ok(state) => tracing::info!(
                server = %state.descriptor.server,
                kinds = state.mapping.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Connection state built"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to build connection state"),
        }
        metrics::record_build(outcome.is_ok());

        tx.send_replace(Some(outcome));
    }
}

/// Returns the slot to `Empty` if a build unwinds before publishing.
struct ResetOnUnwind<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl ResetOnUnwind<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().slot = Slot::Empty;
        }
    }
}
