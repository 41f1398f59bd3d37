//! Resource type mapping.
//!
//! # Responsibilities
//! - Map `(apiVersion, kind)` pairs to API locations
//! - Report whether a kind is namespaced
//!
//! # Design Decisions
//! - Entries are keyed by group-kind (`Deployment.apps`, `Pod`), versions
//!   are listed per entry with the preferred version first
//! - Entries live in a `DashMap` so a consumer can rewrite them through a
//!   shared `Arc`; that rewrite is what the race detector watches

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use serde::Serialize;

use crate::cluster::race::RaceDetector;

/// Where a resource kind lives in the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiLocation {
    /// API group, empty for the core group.
    pub group: String,
    /// Served versions, preferred first.
    pub versions: Vec<String>,
    /// Kind name (`Deployment`).
    pub kind: String,
    /// Plural resource name (`deployments`).
    pub resource: String,
    /// Whether objects of this kind live in a namespace.
    pub namespaced: bool,
}

impl ApiLocation {
    pub fn preferred_version(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }

    /// `group/version`, or just `version` for the core group.
    pub fn group_version(&self, version: &str) -> String {
        if self.group.is_empty() {
            version.to_string()
        } else {
            format!("{}/{}", self.group, version)
        }
    }

    fn key(&self) -> String {
        group_kind_key(&self.group, &self.kind)
    }
}

fn group_kind_key(group: &str, kind: &str) -> String {
    if group.is_empty() {
        kind.to_string()
    } else {
        format!("{}.{}", kind, group)
    }
}

/// Split an `apiVersion` string into `(group, version)`.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Mapping from resource kinds to API locations.
pub struct TypeMapping {
    entries: DashMap<String, ApiLocation>,
    race_detector: RaceDetector,
}

impl TypeMapping {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            race_detector: RaceDetector::new(),
        }
    }

    pub fn from_locations(locations: impl IntoIterator<Item = ApiLocation>) -> Self {
        let mapping = Self::new();
        for location in locations {
            mapping.insert(location);
        }
        mapping
    }

    /// Add a location, merging versions into an existing entry for the same group-kind.
    pub fn insert(&self, location: ApiLocation) {
        let key = location.key();
        match self.entries.get_mut(&key) {
            Some(mut existing) => {
                for version in location.versions {
                    if !existing.versions.contains(&version) {
                        existing.versions.push(version);
                    }
                }
            }
            None => {
                self.entries.insert(key, location);
            }
        }
    }

    /// Look up the location serving `kind` at `api_version`.
    pub fn resolve(&self, api_version: &str, kind: &str) -> Option<ApiLocation> {
        let (group, version) = split_api_version(api_version);
        let entry = self.entries.get(&group_kind_key(group, kind))?;
        if entry.versions.iter().any(|v| v == version) {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, ApiLocation> {
        self.entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Rewrite every entry in place: versions sorted and de-duplicated,
    /// resource names lower-cased.
    ///
    /// Holders sharing this mapping see the rewritten entries.
    pub fn normalize_in_place(&self) {
        for mut entry in self.entries.iter_mut() {
            let location = entry.value_mut();
            location.versions.sort();
            location.versions.dedup();
            location.resource = location.resource.to_lowercase();
        }
    }

    /// Race detection for in-place mutation of this mapping.
    pub fn race_detector(&self) -> &RaceDetector {
        &self.race_detector
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TypeMapping {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            race_detector: RaceDetector::new(),
        }
    }
}

impl PartialEq for TypeMapping {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl fmt::Debug for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapping")
            .field("entries", &self.snapshot())
            .finish()
    }
}
