//! Evaluation tasks: the closed set of operations a program runs against the VM.
//!
//! Stack convention: "top" is the most recently pushed keyframe. Binary tasks pop
//! the top first, then the second. When fewer operands than expected are present
//! the available operand is pushed back unchanged.

mod blend;
mod root_motion;
mod source;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::keyframe::Keyframe;
use crate::program::EvaluationProgram;
use crate::vm::EvaluationVm;

pub use blend::{BlendAlpha, BlendPerBoneTask, BlendTwoTask};
pub use root_motion::{ConvertRootMotionTask, StoreRootTransformTask};
pub use source::SampleClipTask;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Push the reference pose (or the additive identity).
    PushReferencePose {
        #[serde(default)]
        additive: bool,
    },
    /// Push a copy of a prepared keyframe.
    PushKeyframe(Arc<Keyframe>),
    SampleClip(SampleClipTask),
    BlendTwo(BlendTwoTask),
    /// Blend-two that keeps authoritative root transforms and one-sided root deltas.
    BlendTwoPreserveRootMotion(BlendTwoTask),
    /// Multiply the top keyframe by `scale`. Rotations are not renormalized.
    OverwriteWithScale { scale: f32 },
    /// `top = top + second * scale`.
    AddWithScale { scale: f32 },
    /// `running = running + top * scale`, where `running` is the second keyframe.
    AccumulateAbsoluteBlend { scale: f32 },
    /// Layer the additive keyframe on top onto the base keyframe below it.
    ApplyAdditive { alpha: f32 },
    BlendPerBone(BlendPerBoneTask),
    NormalizeRotations,
    /// Replay a frozen program against the same VM.
    ExecuteProgram(Arc<EvaluationProgram>),
    #[serde(skip)]
    ConvertRootMotionToWorldSpace(ConvertRootMotionTask),
    #[serde(skip)]
    StoreRootTransform(StoreRootTransformTask),
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::PushReferencePose { .. } => "PushReferencePose",
            Task::PushKeyframe(_) => "PushKeyframe",
            Task::SampleClip(_) => "SampleClip",
            Task::BlendTwo(_) => "BlendTwo",
            Task::BlendTwoPreserveRootMotion(_) => "BlendTwoPreserveRootMotion",
            Task::OverwriteWithScale { .. } => "OverwriteWithScale",
            Task::AddWithScale { .. } => "AddWithScale",
            Task::AccumulateAbsoluteBlend { .. } => "AccumulateAbsoluteBlend",
            Task::ApplyAdditive { .. } => "ApplyAdditive",
            Task::BlendPerBone(_) => "BlendPerBone",
            Task::NormalizeRotations => "NormalizeRotations",
            Task::ExecuteProgram(_) => "ExecuteProgram",
            Task::ConvertRootMotionToWorldSpace(_) => "ConvertRootMotionToWorldSpace",
            Task::StoreRootTransform(_) => "StoreRootTransform",
        }
    }

    /// Run this task against `vm`.
    pub fn execute(&self, vm: &mut EvaluationVm) {
        log::trace!("executing task {}", self);
        match self {
            Task::PushReferencePose { additive } => source::push_reference_pose(vm, *additive),
            Task::PushKeyframe(keyframe) => source::push_keyframe(vm, keyframe),
            Task::SampleClip(task) => task.execute(vm),
            Task::BlendTwo(task) => task.execute(vm, false),
            Task::BlendTwoPreserveRootMotion(task) => task.execute(vm, true),
            Task::OverwriteWithScale { scale } => blend::overwrite_with_scale(vm, *scale),
            Task::AddWithScale { scale } => blend::add_with_scale(vm, *scale),
            Task::AccumulateAbsoluteBlend { scale } => blend::accumulate_absolute_blend(vm, *scale),
            Task::ApplyAdditive { alpha } => blend::apply_additive(vm, *alpha),
            Task::BlendPerBone(task) => task.execute(vm),
            Task::NormalizeRotations => blend::normalize_rotations(vm),
            Task::ExecuteProgram(program) => program.execute(vm),
            Task::ConvertRootMotionToWorldSpace(task) => task.execute(vm),
            Task::StoreRootTransform(task) => task.execute(vm),
        }
    }

    pub fn blend_two(alpha: f32) -> Self {
        Task::BlendTwo(BlendTwoTask::fixed(alpha))
    }

    pub fn blend_two_preserve_root_motion(alpha: f32) -> Self {
        Task::BlendTwoPreserveRootMotion(BlendTwoTask::fixed(alpha))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::PushReferencePose { additive } => write!(f, "PushReferencePose(additive={additive})"),
            Task::SampleClip(task) => write!(f, "SampleClip({} @ {:.3})", task.clip.name, task.time),
            Task::BlendTwo(task) | Task::BlendTwoPreserveRootMotion(task) => {
                write!(f, "{}({})", self.name(), task.alpha)
            }
            Task::OverwriteWithScale { scale }
            | Task::AddWithScale { scale }
            | Task::AccumulateAbsoluteBlend { scale } => write!(f, "{}({scale:.4})", self.name()),
            Task::ApplyAdditive { alpha } => write!(f, "ApplyAdditive({alpha:.4})"),
            Task::BlendPerBone(task) => write!(f, "BlendPerBone({:.4})", task.blend_weight),
            Task::ExecuteProgram(program) => write!(f, "ExecuteProgram[{}]", program.len()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Pop the top two keyframes as `(second, top)`. With a single keyframe it is pushed
/// back and `None` is returned.
pub(crate) fn pop_pair(vm: &mut EvaluationVm, task: &str) -> Option<(Keyframe, Keyframe)> {
    let Some(top) = vm.pop_keyframe() else {
        log::warn!("{task}: no keyframe on the stack");
        return None;
    };
    let Some(second) = vm.pop_keyframe() else {
        log::warn!("{task}: single operand, passing it through");
        vm.push_keyframe(top);
        return None;
    };
    Some((second, top))
}
