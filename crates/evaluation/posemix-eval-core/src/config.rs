//! Evaluation VM configuration.

use serde::{Deserialize, Serialize};

/// Name of the stack every built-in task reads and writes.
pub const KEYFRAME_STACK: &str = "keyframes";

/// Configuration for VM sizing and the skeleton LOD it evaluates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VmConfig {
    /// Initial capacity hint for each named stack.
    pub stack_capacity: usize,
    /// Skeleton LOD; keyframes made by the VM carry that LOD's bone count.
    pub lod: usize,
    /// Stack created up front; tasks operate on it.
    pub default_stack: String,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: 8,
            lod: 0,
            default_stack: KEYFRAME_STACK.to_string(),
        }
    }
}
