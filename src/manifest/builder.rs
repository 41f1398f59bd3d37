//! Resource builder.
//!
//! # Responsibilities
//! - Read manifest sources and decode their documents
//! - Expand `List` documents when flattening
//! - Resolve each object against the type mapping and default its namespace
//!
//! # Design Decisions
//! - Builder-style configuration, consumed by `infos()`
//! - Read errors are deferred to `infos()` so calls chain
//! - `normalize_mapping` makes the builder a mutating consumer: it rewrites
//!   the mapping and stamps client defaults on the descriptor in place,
//!   under both race detectors
//! - Each builder is a distinct mutator; builders that are ordered with
//!   each other can share a `MutatorId`

use std::io::Read;
use std::sync::Arc;

use serde_json::Value;

use crate::cluster::mapping::split_api_version;
use crate::cluster::{ApiLocation, ClientDefaults, ConnectionDescriptor, MutatorId, TypeMapping};
use crate::manifest::decode::decode_documents;
use crate::manifest::types::{ManifestError, ManifestResult, ResourceInfo};

struct ManifestSource {
    name: String,
    text: ManifestResult<String>,
}

/// Turns manifest sources into resolved resources.
pub struct ResourceBuilder {
    descriptor: Arc<ConnectionDescriptor>,
    mapping: Arc<TypeMapping>,
    continue_on_error: bool,
    flatten: bool,
    normalize_mapping: bool,
    mutator: MutatorId,
    sources: Vec<ManifestSource>,
}

impl ResourceBuilder {
    pub fn new(descriptor: Arc<ConnectionDescriptor>, mapping: Arc<TypeMapping>) -> Self {
        Self {
            descriptor,
            mapping,
            continue_on_error: false,
            flatten: false,
            normalize_mapping: false,
            mutator: MutatorId::next(),
            sources: Vec::new(),
        }
    }

    /// Keep going after a bad document and report every error at the end.
    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Expand `List` documents into their items.
    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Re-normalize the received mapping and descriptor in place before use.
    pub fn normalize_mapping(mut self) -> Self {
        self.normalize_mapping = true;
        self
    }

    /// Mutate as `mutator` instead of a fresh identity.
    pub fn mutator(mut self, mutator: MutatorId) -> Self {
        self.mutator = mutator;
        self
    }

    /// Add manifest text under `name`.
    pub fn source_text(mut self, text: impl Into<String>, name: impl Into<String>) -> Self {
        self.sources.push(ManifestSource {
            name: name.into(),
            text: Ok(text.into()),
        });
        self
    }

    /// Add a readable stream under `name`.
    pub fn stream<R: Read>(mut self, mut reader: R, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut text = String::new();
        let text = match reader.read_to_string(&mut text) {
            Ok(_) => Ok(text),
            Err(error) => Err(ManifestError::Io {
                source_name: name.clone(),
                error,
            }),
        };
        self.sources.push(ManifestSource { name, text });
        self
    }

    /// Decode, validate and resolve every document of every source.
    pub fn infos(self) -> ManifestResult<Vec<ResourceInfo>> {
        let Self {
            descriptor,
            mapping,
            continue_on_error,
            flatten,
            normalize_mapping,
            mutator,
            sources,
        } = self;
        let resolver = Resolver {
            descriptor: &descriptor,
            mapping: &mapping,
            flatten,
            stamp_defaults: normalize_mapping,
        };

        let guards = if normalize_mapping {
            let mapping_guard = mapping.race_detector().enter("type mapping", mutator);
            let descriptor_guard = descriptor.race_detector().enter("connection descriptor", mutator);
            mapping.normalize_in_place();
            Some((mapping_guard, descriptor_guard))
        } else {
            None
        };

        let mut outcome = resolver.process(sources, continue_on_error);

        // Finished whichever way processing ended
        if let Some((mapping_guard, descriptor_guard)) = guards {
            let races: Vec<ManifestError> = [mapping_guard.finish().err(), descriptor_guard.finish().err()]
                .into_iter()
                .flatten()
                .map(ManifestError::from)
                .collect();
            if !races.is_empty() {
                let mut errors = outcome.err().unwrap_or_default();
                errors.extend(races);
                outcome = Err(errors);
            }
        }

        outcome.map_err(|mut errors| {
            if errors.len() == 1 {
                errors.remove(0)
            } else {
                ManifestError::Aggregate(errors)
            }
        })
    }
}

struct Resolver<'a> {
    descriptor: &'a ConnectionDescriptor,
    mapping: &'a TypeMapping,
    flatten: bool,
    stamp_defaults: bool,
}

impl Resolver<'_> {
    /// Every resolved object, or the errors met on the way. Without
    /// `continue_on_error` the first error ends processing.
    fn process(
        &self,
        sources: Vec<ManifestSource>,
        continue_on_error: bool,
    ) -> Result<Vec<ResourceInfo>, Vec<ManifestError>> {
        let mut infos = Vec::new();
        let mut errors = Vec::new();

        'sources: for source in sources {
            let text = match source.text {
                Ok(text) => text,
                Err(e) => {
                    errors.push(e);
                    if continue_on_error {
                        continue;
                    }
                    break;
                }
            };

            let documents = match decode_documents(&text, &source.name) {
                Ok(documents) => documents,
                Err(e) => {
                    errors.push(e);
                    if continue_on_error {
                        continue;
                    }
                    break;
                }
            };
            tracing::debug!(source = %source.name, documents = documents.len(), "Decoded manifest source");

            for (index, document) in documents {
                let objects = match self.expand(document, &source.name, index) {
                    Ok(objects) => objects,
                    Err(e) => {
                        errors.push(e);
                        if continue_on_error {
                            continue;
                        }
                        break 'sources;
                    }
                };
                for object in objects {
                    match self.resolve(object, &source.name, index) {
                        Ok(info) => infos.push(info),
                        Err(e) => {
                            errors.push(e);
                            if !continue_on_error {
                                break 'sources;
                            }
                        }
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(infos)
        } else {
            Err(errors)
        }
    }

    fn expand(&self, document: Value, source: &str, index: usize) -> ManifestResult<Vec<Value>> {
        let is_list = document
            .get("kind")
            .and_then(Value::as_str)
            .is_some_and(|kind| kind.ends_with("List"))
            && document.get("items").is_some_and(Value::is_array);
        if !is_list {
            return Ok(vec![document]);
        }
        if !self.flatten {
            return Err(invalid(source, index, "list documents require flattening"));
        }

        let mut expanded = Vec::new();
        if let Value::Object(mut list) = document {
            if let Some(Value::Array(items)) = list.remove("items") {
                for item in items {
                    expanded.extend(self.expand(item, source, index)?);
                }
            }
        }
        Ok(expanded)
    }

    fn resolve(&self, mut object: Value, source: &str, index: usize) -> ManifestResult<ResourceInfo> {
        if !object.is_object() {
            return Err(invalid(source, index, "document is not an object"));
        }
        let field = |pointer: &str| {
            object
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let api_version = field("/apiVersion").ok_or_else(|| invalid(source, index, "missing apiVersion"))?;
        let kind = field("/kind").ok_or_else(|| invalid(source, index, "missing kind"))?;
        let name = field("/metadata/name").ok_or_else(|| invalid(source, index, "missing metadata.name"))?;
        let declared_namespace = field("/metadata/namespace");

        let location = self.mapping.resolve(&api_version, &kind).ok_or_else(|| {
            invalid(
                source,
                index,
                &format!("no matches for kind \"{}\" in version \"{}\"", kind, api_version),
            )
        })?;

        let namespace = if location.namespaced {
            Some(declared_namespace.unwrap_or_else(|| self.descriptor.namespace.clone()))
        } else {
            None
        };
        if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
            match &namespace {
                Some(ns) => {
                    metadata.insert("namespace".to_string(), Value::String(ns.clone()));
                }
                None => {
                    metadata.remove("namespace");
                }
            }
        }

        if self.stamp_defaults {
            self.stamp_client_defaults(&location, &api_version);
        }

        Ok(ResourceInfo {
            source: source.to_string(),
            document: index,
            name,
            namespace,
            api_version,
            kind,
            location,
            object,
        })
    }

    fn stamp_client_defaults(&self, location: &ApiLocation, api_version: &str) {
        let (_, version) = split_api_version(api_version);
        let current = self.descriptor.client_defaults();
        self.descriptor.store_client_defaults(ClientDefaults {
            group_version: Some(location.group_version(version)),
            api_path: if location.group.is_empty() { "/api" } else { "/apis" }.to_string(),
            content_type: current.content_type.clone(),
        });
    }
}

fn invalid(source: &str, document: usize, message: &str) -> ManifestError {
    ManifestError::Validation {
        source_name: source.to_string(),
        document,
        message: message.to_string(),
    }
}
