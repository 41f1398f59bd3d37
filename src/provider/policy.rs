//! Share/clone policy selection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::clone::ClonedHandout;
use crate::provider::share::SharedHandout;
use crate::provider::Handout;

/// Whether callers receive the cached objects or copies of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePolicy {
    /// Every caller gets the same instance.
    #[default]
    ShareByReference,
    /// Every caller gets an independent copy.
    CloneOnRead,
}

impl SharePolicy {
    /// Policy selected by a `--clone-config` style switch.
    pub fn from_clone_flag(clone: bool) -> Self {
        if clone {
            SharePolicy::CloneOnRead
        } else {
            SharePolicy::ShareByReference
        }
    }

    /// Strategy implementing this policy.
    pub fn handout(self) -> Box<dyn Handout> {
        match self {
            SharePolicy::ShareByReference => Box::new(SharedHandout::new()),
            SharePolicy::CloneOnRead => Box::new(ClonedHandout::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SharePolicy::ShareByReference => "share_by_reference",
            SharePolicy::CloneOnRead => "clone_on_read",
        }
    }
}

impl fmt::Display for SharePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
