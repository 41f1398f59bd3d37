//! Fixed-size worker pool.
//!
//! # Responsibilities
//! - Spawn a fixed number of concurrent workers against one provider
//! - Hand each worker its connection state, then run the task
//! - Collect every outcome, panics included, after all workers finish

use std::future::Future;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::cluster::{ConnectionDescriptor, TypeMapping};
use crate::observability::metrics;
use crate::provider::ConfigProvider;
use crate::worker::report::{PoolReport, WorkerError, WorkerOutcome};

/// What a worker task receives.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Zero-based worker index.
    pub worker: usize,
    pub run_id: Uuid,
    pub descriptor: Arc<ConnectionDescriptor>,
    pub mapping: Arc<TypeMapping>,
}

/// Runs `concurrency` workers to completion.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    /// Create a pool; a concurrency of 0 runs one worker.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every worker and wait for all of them.
    ///
    /// A failing or panicking worker never stops its siblings; its error is
    /// recorded in the report.
    pub async fn run<F, Fut, T>(&self, provider: &ConfigProvider, task: F) -> PoolReport<T>
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkerError>> + Send + 'static,
        T: Send + 'static,
    {
        let run_id = Uuid::new_v4();
        let task = Arc::new(task);
        tracing::info!(%run_id, concurrency = self.concurrency, "Starting workers");

        let handles: Vec<_> = (0..self.concurrency)
            .map(|worker| {
                let provider = provider.clone();
                let task = task.clone();
                let span = tracing::info_span!("worker", worker, %run_id);
                let handle = tokio::spawn(run_worker(worker, run_id, provider, task).instrument(span));
                (worker, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (worker, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(WorkerError::Panicked {
                    worker,
                    message: panic_message(e.into_panic()),
                }),
                Err(_) => Err(WorkerError::Cancelled { worker }),
            };

            metrics::record_worker(result.is_ok());
            match &result {
                Ok(_) => tracing::debug!(worker, "Worker finished"),
                Err(e) => tracing::warn!(worker, error = %e, "Worker failed"),
            }
            outcomes.push(WorkerOutcome { worker, result });
        }

        PoolReport { run_id, outcomes }
    }
}

async fn run_worker<F, Fut, T>(
    worker: usize,
    run_id: Uuid,
    provider: ConfigProvider,
    task: Arc<F>,
) -> Result<T, WorkerError>
where
    F: Fn(WorkerContext) -> Fut,
    Fut: Future<Output = Result<T, WorkerError>>,
{
    tracing::debug!("Worker started");
    let descriptor = provider.connection_descriptor().await?;
    let mapping = provider.type_mapping().await?;
    (*task)(WorkerContext {
        worker,
        run_id,
        descriptor,
        mapping,
    })
    .await
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
