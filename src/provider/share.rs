//! Share-by-reference handout.

use std::sync::Arc;
use crate::cluster::{ConnectionDescriptor, TypeMapping};
use crate::provider::Handout;

/// Hands every caller the cached `Arc` itself.
/// Callers must treat what they receive as read-only.
#[derive(Debug, Default)]
pub struct SharedHandout;

impl SharedHandout {
    pub fn new() -> Self {
        Self
    }
}

impl Handout for SharedHandout {
    fn descriptor(&self, cached: &Arc<ConnectionDescriptor>) -> Arc<ConnectionDescriptor> {
        Arc::clone(cached)
    }

    fn mapping(&self, cached: &Arc<TypeMapping>) -> Arc<TypeMapping> {
        Arc::clone(cached)
    }
}
