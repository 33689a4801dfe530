//! Errors raised while loading or validating trait assets.
//!
//! Missing assets at runtime are not errors; nodes fall back to the base pose.

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TraitError {
    /// Attribute entries are keyed by their owning bone
    #[error("weight table '{table}': attribute entry '{entry}' needs a bone parent")]
    AttributeWithoutBoneParent { table: String, entry: String },

    #[error("weight table '{table}': entry '{entry}' names unknown parent '{parent}'")]
    UnknownParent {
        table: String,
        entry: String,
        parent: String,
    },

    #[error("blend space '{space}': triangle {triangle} {reason}")]
    InvalidTriangle {
        space: String,
        triangle: usize,
        reason: &'static str,
    },

    /// More than two samples need an authored triangulation
    #[error("blend space '{space}' has {samples} samples but no triangles")]
    MissingTriangulation { space: String, samples: usize },

    #[error("blend space '{space}': sample {sample} plays unknown clip '{clip}'")]
    MissingClip {
        space: String,
        sample: usize,
        clip: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
