use std::sync::Arc;

use posemix_api_core::quat;
use posemix_eval_core::{
    AttributeId, AttributeValue, ComponentTransforms, ConvertRootMotionTask, EvaluationProgram,
    EvaluationVm, Keyframe, ReferenceSkeleton, RootMotionConversion, RootMotionData,
    RootMotionDestination, RootMotionWrite, SharedRootMotion, StoreRootTransformTask, Task,
    Transform, VmConfig,
};

fn approx3(a: [f32; 3], b: [f32; 3], eps: f32) {
    for i in 0..3 {
        assert!(
            (a[i] - b[i]).abs() <= eps,
            "approx failed: left={a:?} right={b:?} eps={eps}"
        );
    }
}

fn vm() -> EvaluationVm {
    let text = posemix_test_fixtures::skeletons::json("biped").expect("biped fixture");
    let skeleton = ReferenceSkeleton::from_json(&text).expect("valid skeleton");
    EvaluationVm::new(Arc::new(skeleton), VmConfig::default())
}

fn data_at_actor(destination: RootMotionDestination, actor: [f32; 3]) -> SharedRootMotion {
    let data = RootMotionData::shared(destination);
    data.initialize(ComponentTransforms {
        component_world: Transform::from_translation(actor),
        actor_world: Transform::from_translation(actor),
    });
    data
}

fn convert(data: &SharedRootMotion, flags: RootMotionConversion) -> Task {
    Task::ConvertRootMotionToWorldSpace(ConvertRootMotionTask {
        root_motion: data.clone(),
        flags,
        root_override: Some(Transform::from_translation([0.0, 2.0, 0.0])),
        transform_origin: Some(Transform::from_translation([0.0, 0.0, 3.0])),
    })
}

fn store(data: &SharedRootMotion, root_component_keyed: bool) -> Task {
    Task::StoreRootTransform(StoreRootTransformTask {
        root_motion: data.clone(),
        component_has_keyed_transform: false,
        root_component_has_keyed_transform: root_component_keyed,
    })
}

fn pose_with_root(vm: &EvaluationVm, x: f32) -> Keyframe {
    let mut kf = vm.make_reference_keyframe(false);
    kf.pose.transforms[0] = Transform::from_translation([x, 0.0, 0.0]);
    kf
}

fn root_of(kf: &Keyframe) -> Transform {
    kf.attributes
        .get_transform(&AttributeId::root_transform())
        .expect("root transform attribute")
}

#[test]
fn converts_root_bone_into_world_space() {
    let mut vm = vm();
    let data = data_at_actor(RootMotionDestination::LeaveAsAttribute, [10.0, 0.0, 0.0]);
    vm.push_keyframe(pose_with_root(&vm, 1.0));
    convert(&data, RootMotionConversion::NONE).execute(&mut vm);
    let out = vm.pop_keyframe().expect("converted");
    approx3(root_of(&out).translation, [11.0, 0.0, 0.0], 1e-5);
    assert!(!out
        .attributes
        .contains(&AttributeId::root_transform_is_authoritative()));
}

#[test]
fn root_override_is_authoritative_and_origin_offsets() {
    let mut vm = vm();
    let data = data_at_actor(RootMotionDestination::LeaveAsAttribute, [10.0, 0.0, 0.0]);
    vm.push_keyframe(pose_with_root(&vm, 1.0));
    convert(
        &data,
        RootMotionConversion::APPLY_ROOT_OVERRIDE | RootMotionConversion::APPLY_TRANSFORM_ORIGIN,
    )
    .execute(&mut vm);
    let out = vm.pop_keyframe().expect("converted");
    approx3(root_of(&out).translation, [10.0, 2.0, 3.0], 1e-5);
    assert_eq!(
        out.attributes
            .get_int(&AttributeId::root_transform_is_authoritative()),
        Some(1)
    );
}

#[test]
fn mesh_rotation_offset_rotates_root_and_delta() {
    let mut vm = vm();
    let data = RootMotionData::shared(RootMotionDestination::LeaveAsAttribute);
    let yaw = quat::from_axis_angle([0.0, 0.0, 1.0], -std::f32::consts::FRAC_PI_2);
    data.initialize(ComponentTransforms {
        component_world: Transform::from_rotation(yaw),
        actor_world: Transform::IDENTITY,
    });
    let mut kf = pose_with_root(&vm, 1.0);
    kf.attributes.set(
        AttributeId::root_motion_delta(),
        AttributeValue::Transform(Transform::from_translation([1.0, 0.0, 0.0])),
    );
    vm.push_keyframe(kf);
    convert(&data, RootMotionConversion::NONE).execute(&mut vm);
    let out = vm.pop_keyframe().expect("converted");
    approx3(root_of(&out).translation, [0.0, -1.0, 0.0], 1e-5);
    let delta = out
        .attributes
        .get_transform(&AttributeId::root_motion_delta())
        .expect("delta");
    approx3(delta.translation, [0.0, -1.0, 0.0], 1e-5);
}

#[test]
fn store_to_actor_queues_write_and_resets_root_bone() {
    let mut vm = vm();
    let data = data_at_actor(RootMotionDestination::ApplyToActor, [10.0, 0.0, 0.0]);
    let program: EvaluationProgram = [
        Task::PushKeyframe(Arc::new(pose_with_root(&vm, 1.0))),
        convert(&data, RootMotionConversion::NONE),
        store(&data, false),
    ]
    .into_iter()
    .collect();
    program.execute(&mut vm);
    let out = vm.pop_keyframe().expect("stored");
    assert_eq!(out.pose.transforms[0], Transform::IDENTITY);
    assert!(!out.attributes.contains(&AttributeId::root_transform()));
    match data.pending_write() {
        Some(RootMotionWrite::Actor(t)) => approx3(t.translation, [11.0, 0.0, 0.0], 1e-5),
        other => panic!("expected an actor write, got {other:?}"),
    }
    assert!(data.root_transform().is_some());
}

#[test]
fn keyed_root_component_suppresses_actor_write() {
    let mut vm = vm();
    let data = data_at_actor(RootMotionDestination::ApplyToActor, [0.0; 3]);
    vm.push_keyframe(pose_with_root(&vm, 1.0));
    convert(&data, RootMotionConversion::NONE).execute(&mut vm);
    store(&data, true).execute(&mut vm);
    assert!(data.pending_write().is_none());
    assert!(data.root_transform().is_some());
}

#[test]
fn keep_on_root_bone_restores_component_space_root() {
    let mut vm = vm();
    let data = data_at_actor(RootMotionDestination::KeepOnRootBone, [10.0, 0.0, 0.0]);
    vm.push_keyframe(pose_with_root(&vm, 1.0));
    convert(&data, RootMotionConversion::NONE).execute(&mut vm);
    store(&data, false).execute(&mut vm);
    let out = vm.pop_keyframe().expect("stored");
    approx3(out.pose.transforms[0].translation, [1.0, 0.0, 0.0], 1e-5);
    assert!(data.pending_write().is_none());
}

#[test]
fn leave_as_attribute_keeps_everything() {
    let mut vm = vm();
    let data = data_at_actor(RootMotionDestination::LeaveAsAttribute, [0.0; 3]);
    vm.push_keyframe(pose_with_root(&vm, 1.0));
    convert(&data, RootMotionConversion::NONE).execute(&mut vm);
    store(&data, false).execute(&mut vm);
    let out = vm.pop_keyframe().expect("stored");
    assert!(out.attributes.contains(&AttributeId::root_transform()));
    approx3(out.pose.transforms[0].translation, [1.0, 0.0, 0.0], 1e-6);
}

#[test]
fn programs_with_root_motion_tasks_do_not_serialize() {
    let data = data_at_actor(RootMotionDestination::Discard, [0.0; 3]);
    let mut program = EvaluationProgram::new();
    program.append_task(store(&data, false));
    assert!(program.to_json().is_err());
}
