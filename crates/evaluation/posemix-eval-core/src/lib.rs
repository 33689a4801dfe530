//! posemix-eval-core: keyframe stacks, evaluation tasks and programs (engine-agnostic)
//!
//! A program is an ordered list of tasks. Executing it against an `EvaluationVm`
//! pops operand keyframes and pushes results; the keyframe left on top is the
//! blended pose.

pub mod alpha;
pub mod attributes;
pub mod clip;
pub mod config;
pub mod curves;
pub mod error;
pub mod keyframe;
pub mod program;
pub mod root_motion;
pub mod skeleton;
pub mod task;
pub mod vm;
pub mod weights;

pub use alpha::{FloatRange, ScaleBiasClamp};
pub use attributes::AttributeSet;
pub use clip::{AnimationClip, BoneTrack, CurveKey, CurveTrack, TransformKey};
pub use config::{VmConfig, KEYFRAME_STACK};
pub use curves::CurveSet;
pub use error::EvalError;
pub use keyframe::{Keyframe, Pose};
pub use posemix_api_core::{AttributeId, AttributeValue, Transform};
pub use program::EvaluationProgram;
pub use root_motion::{
    is_interactive_move_in_progress, set_interactive_move_in_progress, ComponentTransforms,
    ConversionCache, RootMotionConversion, RootMotionData, RootMotionDestination,
    RootMotionWrite, SharedRootMotion,
};
pub use skeleton::ReferenceSkeleton;
pub use task::{
    BlendAlpha, BlendPerBoneTask, BlendTwoTask, ConvertRootMotionTask, SampleClipTask,
    StoreRootTransformTask, Task,
};
pub use vm::EvaluationVm;
pub use weights::PerBoneBlendWeights;
