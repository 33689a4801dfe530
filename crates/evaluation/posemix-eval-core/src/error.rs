//! Error types for loading evaluation data.
//!
//! Degenerate stack input never produces an error; tasks absorb it locally.

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum EvalError {
    /// Skeleton has no bones
    #[error("skeleton '{name}' has no bones")]
    EmptySkeleton { name: String },

    /// Parallel skeleton arrays disagree in length
    #[error("skeleton '{name}': {field} has {actual} entries, expected {expected}")]
    SkeletonArrayMismatch {
        name: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Parent must precede its child so that LOD truncation keeps hierarchies intact
    #[error("skeleton '{name}': bone {bone} has parent {parent} which does not precede it")]
    InvalidParent {
        name: String,
        bone: usize,
        parent: i32,
    },

    /// LOD bone counts must be non-increasing and within the bone count
    #[error("skeleton '{name}': LOD {lod} keeps {count} bones, outside 1..={max}")]
    InvalidLod {
        name: String,
        lod: usize,
        count: usize,
        max: usize,
    },

    /// Clip track targets a bone the skeleton does not have
    #[error("clip '{clip}' animates bone {bone} but the skeleton has {bone_count} bones")]
    ClipBoneOutOfRange {
        clip: String,
        bone: usize,
        bone_count: usize,
    },

    /// Clip track keys must be sorted by time
    #[error("clip '{clip}': keys of track {track} are not sorted by time")]
    UnsortedKeys { clip: String, track: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
