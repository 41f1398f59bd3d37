//! Clone-on-read handout.

use std::sync::Arc;
use crate::cluster::{ConnectionDescriptor, TypeMapping};
use crate::provider::Handout;

/// Hands every caller its own deep copy of the cached state.
/// Mutation by one caller is invisible to the others.
#[derive(Debug, Default)]
pub struct ClonedHandout;

impl ClonedHandout {
    pub fn new() -> Self {
        Self
    }
}

impl Handout for ClonedHandout {
    fn descriptor(&self, cached: &Arc<ConnectionDescriptor>) -> Arc<ConnectionDescriptor> {
        Arc::new(ConnectionDescriptor::clone(cached))
    }

    fn mapping(&self, cached: &Arc<TypeMapping>) -> Arc<TypeMapping> {
        Arc::new(TypeMapping::clone(cached))
    }
}
