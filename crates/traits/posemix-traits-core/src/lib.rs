//! posemix-traits-core: pose nodes that turn runtime state into blend tasks
//!
//! Nodes update once per tick and then append their tasks to an evaluation
//! program, children first. Discrete transitions go through `BlendSmoother`,
//! masked layering through `BlendLayer`, and 2D parametric blends through
//! `BlendSpacePlayer`.

pub mod alpha_blend;
pub mod blend_layer;
pub mod blend_smoother;
pub mod blend_space;
pub mod error;
pub mod node;

pub use alpha_blend::{AlphaBlend, AlphaBlendOption};
pub use blend_layer::{BlendLayer, WeightEntryKind, WeightTable, WeightTableEntry};
pub use blend_smoother::{BlendSmoother, BlendSmootherSettings, ChildBlendState, SmootherEvent};
pub use blend_space::{
    AxisSmoothing, BlendSample, BlendSpace, BlendSpacePlayer, ClipLibrary, SampleWeight,
};
pub use error::TraitError;
pub use node::{ClipPlayerNode, KeyframeNode, PoseNode, UpdateContext};
