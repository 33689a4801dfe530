use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clip::AnimationClip;
use crate::keyframe::Keyframe;
use crate::vm::EvaluationVm;

pub(super) fn push_reference_pose(vm: &mut EvaluationVm, additive: bool) {
    let keyframe = vm.make_reference_keyframe(additive);
    vm.push_keyframe(keyframe);
}

pub(super) fn push_keyframe(vm: &mut EvaluationVm, keyframe: &Keyframe) {
    assert_eq!(
        keyframe.bone_count(),
        vm.bone_count(),
        "keyframe bone count does not match the VM skeleton/LOD"
    );
    vm.push_keyframe(keyframe.clone());
}

/// Sample a clip over the reference pose (or the additive identity for additive clips).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SampleClipTask {
    pub clip: Arc<AnimationClip>,
    pub time: f32,
    /// Time of the previous sample; root motion clips emit a delta when set.
    #[serde(default)]
    pub previous_time: Option<f32>,
    #[serde(default)]
    pub looping: bool,
}

impl SampleClipTask {
    pub fn new(clip: Arc<AnimationClip>, time: f32, looping: bool) -> Self {
        Self {
            clip,
            time,
            previous_time: None,
            looping,
        }
    }

    pub fn with_previous_time(mut self, previous_time: f32) -> Self {
        self.previous_time = Some(previous_time);
        self
    }

    pub(super) fn execute(&self, vm: &mut EvaluationVm) {
        let mut keyframe = vm.make_reference_keyframe(self.clip.additive);
        self.clip
            .sample_with_root_motion(&mut keyframe, self.time, self.previous_time, self.looping);
        vm.push_keyframe(keyframe);
    }
}
