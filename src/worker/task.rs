//! Manifest processing task run by each worker.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cluster::{ConnectionDescriptor, TypeMapping};
use crate::manifest::{ManifestError, ResourceBuilder, ResourceInfo};
use crate::worker::pool::WorkerContext;
use crate::worker::report::WorkerError;

/// Builder switches applied to every worker's run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderOptions {
    pub flatten: bool,
    pub continue_on_error: bool,
    pub normalize_mapping: bool,
}

/// What one worker produced.
#[derive(Debug)]
pub struct ParsedManifest {
    pub infos: Vec<ResourceInfo>,
    /// The descriptor the worker was handed, kept for identity checks.
    pub descriptor: Arc<ConnectionDescriptor>,
    pub mapping: Arc<TypeMapping>,
}

/// Reads one manifest file and resolves its resources.
#[derive(Debug, Clone)]
pub struct ManifestTask {
    path: PathBuf,
    options: BuilderOptions,
}

impl ManifestTask {
    pub fn new(path: impl Into<PathBuf>, options: BuilderOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub async fn run(&self, ctx: WorkerContext) -> Result<ParsedManifest, WorkerError> {
        let name = self.path.display().to_string();
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|error| ManifestError::Io {
                source_name: name.clone(),
                error,
            })?;

        let mut builder = ResourceBuilder::new(ctx.descriptor.clone(), ctx.mapping.clone());
        if self.options.flatten {
            builder = builder.flatten();
        }
        if self.options.continue_on_error {
            builder = builder.continue_on_error();
        }
        if self.options.normalize_mapping {
            builder = builder.normalize_mapping();
        }

        let infos = builder.source_text(text, name).infos()?;
        tracing::info!(worker = ctx.worker, resources = infos.len(), "Manifest processed");

        Ok(ParsedManifest {
            infos,
            descriptor: ctx.descriptor,
            mapping: ctx.mapping,
        })
    }
}
