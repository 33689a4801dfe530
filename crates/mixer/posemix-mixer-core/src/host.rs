//! Contracts with the host scene and the consumer of resolved tasks.

use posemix_eval_core::{ComponentTransforms, EvaluationVm, Keyframe, Task, Transform};

use crate::ids::ObjectId;

/// Scene-side access the mixer system needs for root motion.
pub trait SceneHost {
    /// Current component and actor world transforms of `object`.
    fn component_transforms(&self, object: ObjectId) -> ComponentTransforms;

    fn set_component_world_transform(&mut self, object: ObjectId, transform: Transform);

    fn set_actor_world_transform(&mut self, object: ObjectId, transform: Transform);
}

/// Push `base`, run `task`, and pop the blended result.
///
/// When the task leaves nothing on the stack the reference pose is returned so the
/// consumer always has a renderable pose. Leftover keyframes are discarded.
pub fn evaluate_target(vm: &mut EvaluationVm, base: Keyframe, task: &Task) -> Keyframe {
    vm.push_keyframe(base);
    task.execute(vm);
    let result = match vm.pop_keyframe() {
        Some(keyframe) => keyframe,
        None => {
            log::warn!("{task} produced no keyframe; using the reference pose");
            vm.make_reference_keyframe(false)
        }
    };
    if vm.keyframe_count() > 0 {
        log::debug!(
            "{task} left {} extra keyframes on the stack",
            vm.keyframe_count()
        );
        vm.clear();
    }
    result
}
