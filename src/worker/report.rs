//! Worker outcomes and the aggregate pool report.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::cluster::{BuildError, RaceDetected};
use crate::manifest::ManifestError;

/// Why a worker failed.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Connection state could not be built.
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    /// Manifest processing failed.
    #[error("manifest processing failed: {0}")]
    Manifest(#[from] ManifestError),

    /// The task observed concurrent mutation of shared state.
    #[error(transparent)]
    Race(#[from] RaceDetected),

    /// The worker panicked.
    #[error("worker {worker} panicked: {message}")]
    Panicked { worker: usize, message: String },

    /// The worker was cancelled before finishing.
    #[error("worker {worker} was cancelled")]
    Cancelled { worker: usize },
}

impl WorkerError {
    /// Whether this failure is a detected race, directly or inside a manifest error.
    pub fn is_race(&self) -> bool {
        match self {
            WorkerError::Race(_) => true,
            WorkerError::Manifest(ManifestError::Race(_)) => true,
            WorkerError::Manifest(ManifestError::Aggregate(errors)) => {
                errors.iter().any(|e| matches!(e, ManifestError::Race(_)))
            }
            _ => false,
        }
    }
}

/// Result of one worker.
#[derive(Debug)]
pub struct WorkerOutcome<T> {
    pub worker: usize,
    pub result: Result<T, WorkerError>,
}

/// Outcomes of every worker of one pool run, ordered by worker index.
#[derive(Debug)]
pub struct PoolReport<T> {
    /// Correlates log lines of one run.
    pub run_id: Uuid,
    pub outcomes: Vec<WorkerOutcome<T>>,
}

impl<T> PoolReport<T> {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn successes(&self) -> impl Iterator<Item = (usize, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|value| (o.worker, value)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &WorkerError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|error| (o.worker, error)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Representative cause when a single status is needed.
    pub fn first_error(&self) -> Option<&WorkerError> {
        self.failures().next().map(|(_, error)| error)
    }
}

impl<T> fmt::Display for PoolReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failure_count();
        write!(
            f,
            "{} workers: {} succeeded, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        )?;
        if let Some((worker, error)) = self.failures().next() {
            write!(f, " (first error: worker {}: {})", worker, error)?;
        }
        Ok(())
    }
}
