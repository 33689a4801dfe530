//! Identifiers for bound objects, mixers and mixer entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-side identity of the object a mixer animates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// One mixer per bound object and animation target.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MixerKey {
    pub object: ObjectId,
    pub target: String,
}

impl MixerKey {
    pub fn new(object: ObjectId, target: impl Into<String>) -> Self {
        Self {
            object,
            target: target.into(),
        }
    }
}

impl fmt::Display for MixerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object.0, self.target)
    }
}

/// Generation-checked index into the entry arena. A handle outlives its entry
/// safely: once the slot is reused the generation no longer matches.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EntryHandle {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
