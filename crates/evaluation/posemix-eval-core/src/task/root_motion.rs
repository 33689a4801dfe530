use posemix_api_core::{quat, AttributeId, AttributeValue, Quat, Transform};

use crate::keyframe::Keyframe;
use crate::root_motion::{
    ConversionCache, RootMotionConversion, RootMotionDestination, RootMotionWrite,
    SharedRootMotion,
};
use crate::vm::EvaluationVm;

/// Express a delta transform in a frame rotated by `rotation`.
fn rotate_delta(delta: &Transform, rotation: Quat) -> Transform {
    Transform {
        translation: quat::rotate(rotation, delta.translation),
        rotation: quat::mul(quat::mul(rotation, delta.rotation), quat::inverse(rotation)),
        scale: delta.scale,
    }
}

/// Converts the top keyframe's root into a world-space `RootTransform` attribute.
///
/// Without a keyed component transform the root drives the actor: it is rotated out
/// of mesh space and placed relative to the actor. With one, it is placed relative
/// to the component's keyed world transform.
#[derive(Clone, Debug)]
pub struct ConvertRootMotionTask {
    pub root_motion: SharedRootMotion,
    pub flags: RootMotionConversion,
    pub root_override: Option<Transform>,
    pub transform_origin: Option<Transform>,
}

impl ConvertRootMotionTask {
    fn to_world(&self, root: &Transform, cache: &ConversionCache) -> (Transform, Quat) {
        let (mut world, mut frame) = if self
            .flags
            .contains(RootMotionConversion::COMPONENT_HAS_KEYED_TRANSFORM)
        {
            (root.mul(&cache.component_world), cache.component_world.rotation)
        } else {
            let mesh_to_actor = quat::inverse(cache.inverse_mesh_to_actor_rotation);
            let in_actor = root.mul(&Transform::from_rotation(mesh_to_actor));
            (
                in_actor.mul(&cache.actor_world),
                quat::mul(cache.actor_world.rotation, mesh_to_actor),
            )
        };
        if self
            .flags
            .contains(RootMotionConversion::APPLY_TRANSFORM_ORIGIN)
        {
            if let Some(origin) = &self.transform_origin {
                world = world.mul(origin);
                frame = quat::mul(origin.rotation, frame);
            }
        }
        (world, frame)
    }

    pub(super) fn execute(&self, vm: &mut EvaluationVm) {
        let Some(mut keyframe) = vm.pop_keyframe() else {
            log::warn!("ConvertRootMotionToWorldSpace: no keyframe on the stack");
            return;
        };
        let cache = self.root_motion.conversion();
        let use_override = self
            .flags
            .contains(RootMotionConversion::APPLY_ROOT_OVERRIDE);
        let root = match self.root_override {
            Some(root) if use_override => root,
            _ => keyframe
                .pose
                .transforms
                .first()
                .copied()
                .unwrap_or(Transform::IDENTITY),
        };

        let (world, frame) = self.to_world(&root, &cache);
        let attributes = &mut keyframe.attributes;
        attributes.set(AttributeId::root_transform(), AttributeValue::Transform(world));
        if use_override {
            attributes.set(
                AttributeId::root_transform_is_authoritative(),
                AttributeValue::Int(1),
            );
        }
        if let Some(delta) = attributes.get_transform(&AttributeId::root_motion_delta()) {
            attributes.set(
                AttributeId::root_motion_delta(),
                AttributeValue::Transform(rotate_delta(&delta, frame)),
            );
        }
        vm.push_keyframe(keyframe);
    }
}

/// Disposes of the resolved root motion according to the shared destination policy.
#[derive(Clone, Debug)]
pub struct StoreRootTransformTask {
    pub root_motion: SharedRootMotion,
    pub component_has_keyed_transform: bool,
    pub root_component_has_keyed_transform: bool,
}

fn strip_root_attributes(keyframe: &mut Keyframe) {
    keyframe.attributes.remove(&AttributeId::root_transform());
    keyframe
        .attributes
        .remove(&AttributeId::root_transform_is_authoritative());
    keyframe.attributes.remove(&AttributeId::root_motion_delta());
}

impl StoreRootTransformTask {
    pub(super) fn execute(&self, vm: &mut EvaluationVm) {
        let Some(mut keyframe) = vm.pop_keyframe() else {
            log::warn!("StoreRootTransform: no keyframe on the stack");
            return;
        };
        let root = keyframe
            .attributes
            .get_transform(&AttributeId::root_transform());
        let delta = keyframe
            .attributes
            .get_transform(&AttributeId::root_motion_delta());
        let cache = self.root_motion.conversion();
        let reference_root = vm
            .skeleton()
            .reference_pose
            .first()
            .copied()
            .unwrap_or(Transform::IDENTITY);

        let mut pending = None;
        match self.root_motion.destination() {
            RootMotionDestination::Discard => {
                if let Some(bone) = keyframe.pose.transforms.first_mut() {
                    *bone = reference_root;
                }
                strip_root_attributes(&mut keyframe);
            }
            RootMotionDestination::KeepOnRootBone => {
                if let (Some(world), Some(bone)) = (root, keyframe.pose.transforms.first_mut()) {
                    *bone = world.relative_to(&cache.component_world);
                }
                strip_root_attributes(&mut keyframe);
            }
            RootMotionDestination::ApplyToComponent => {
                if !self.component_has_keyed_transform {
                    pending = root.map(RootMotionWrite::Component);
                }
                if let Some(bone) = keyframe.pose.transforms.first_mut() {
                    *bone = reference_root;
                }
                strip_root_attributes(&mut keyframe);
            }
            RootMotionDestination::ApplyToActor => {
                if !self.root_component_has_keyed_transform {
                    pending = root.map(RootMotionWrite::Actor);
                }
                if let Some(bone) = keyframe.pose.transforms.first_mut() {
                    *bone = reference_root;
                }
                strip_root_attributes(&mut keyframe);
            }
            RootMotionDestination::LeaveAsAttribute => {}
        }
        self.root_motion.record(root, delta, pending);
        vm.push_keyframe(keyframe);
    }
}
