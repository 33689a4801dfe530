use std::sync::Arc;

use posemix_eval_core::{
    AnimationClip, AttributeId, AttributeValue, EvaluationProgram, EvaluationVm, Keyframe,
    PerBoneBlendWeights, ReferenceSkeleton, SampleClipTask, ScaleBiasClamp, Task, Transform,
    VmConfig,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!(
        (a - b).abs() <= eps,
        "approx failed: left={a} right={b} eps={eps}"
    );
}

fn approx3(a: [f32; 3], b: [f32; 3], eps: f32) {
    approx(a[0], b[0], eps);
    approx(a[1], b[1], eps);
    approx(a[2], b[2], eps);
}

fn biped() -> Arc<ReferenceSkeleton> {
    let text = posemix_test_fixtures::skeletons::json("biped").expect("biped fixture");
    Arc::new(ReferenceSkeleton::from_json(&text).expect("valid skeleton"))
}

fn clip(name: &str) -> Arc<AnimationClip> {
    let text = posemix_test_fixtures::clips::json(name).expect("clip fixture");
    Arc::new(AnimationClip::from_json(&text).expect("valid clip"))
}

fn vm() -> EvaluationVm {
    EvaluationVm::new(biped(), VmConfig::default())
}

/// Reference keyframe with bone 0 moved to `x` along the x axis.
fn shifted(vm: &EvaluationVm, x: f32) -> Keyframe {
    let mut kf = vm.make_reference_keyframe(false);
    kf.pose.transforms[0] = Transform::from_translation([x, 0.0, 0.0]);
    kf
}

#[test]
fn blend_two_interpolates_top_two() {
    let mut vm = vm();
    let a = shifted(&vm, 0.0);
    let b = shifted(&vm, 4.0);
    vm.push_keyframe(a);
    vm.push_keyframe(b);
    Task::blend_two(0.25).execute(&mut vm);
    assert_eq!(vm.keyframe_count(), 1);
    let out = vm.pop_keyframe().expect("result");
    approx3(out.pose.transforms[0].translation, [1.0, 0.0, 0.0], 1e-6);
}

#[test]
fn blend_two_alpha_from_curve_prefers_b_then_a() {
    let mut vm = vm();
    let mut a = shifted(&vm, 0.0);
    a.curves.set("Alpha", 0.75);
    let mut b = shifted(&vm, 4.0);
    b.curves.set("Alpha", 0.25);
    vm.push_keyframe(a.clone());
    vm.push_keyframe(b);
    let task = Task::BlendTwo(posemix_eval_core::BlendTwoTask::from_curve(
        "Alpha",
        ScaleBiasClamp::default(),
    ));
    task.execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    approx(out.pose.transforms[0].translation[0], 1.0, 1e-6);

    // B without the curve falls back to A's value.
    vm.push_keyframe(a);
    vm.push_keyframe(shifted(&vm, 4.0));
    task.execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    approx(out.pose.transforms[0].translation[0], 3.0, 1e-6);
}

#[test]
fn curve_alpha_is_mapped_and_clamped() {
    let mut vm = vm();
    let a = shifted(&vm, 0.0);
    let mut b = shifted(&vm, 2.0);
    b.curves.set("Alpha", 0.8);
    vm.push_keyframe(a);
    vm.push_keyframe(b);
    let sbc = ScaleBiasClamp {
        scale: 2.0,
        ..ScaleBiasClamp::default()
    };
    Task::BlendTwo(posemix_eval_core::BlendTwoTask::from_curve("Alpha", sbc)).execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    // 0.8 * 2 clamps to 1 and yields B.
    approx(out.pose.transforms[0].translation[0], 2.0, 1e-6);
}

#[test]
fn inverted_clamp_from_json_still_evaluates() {
    let json = r#"{"tasks":[{"task":"blend_two","alpha":{"source":"curve","name":"Alpha",
        "scale_bias_clamp":{"clamp":{"min":1.0,"max":0.0}}}}]}"#;
    let program = EvaluationProgram::from_json(json).expect("program parses");
    let mut vm = vm();
    let a = shifted(&vm, 0.0);
    let mut b = shifted(&vm, 2.0);
    b.curves.set("Alpha", 0.5);
    vm.push_keyframe(a);
    vm.push_keyframe(b);
    program.execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    // The inverted range settles on its max (0), leaving A.
    approx(out.pose.transforms[0].translation[0], 0.0, 1e-6);
}

#[test]
fn overwrite_then_accumulate_forms_weighted_average() {
    let mut vm = vm();
    let third = 1.0 / 3.0;
    let program: EvaluationProgram = [
        Task::PushKeyframe(Arc::new(shifted(&vm, 1.0))),
        Task::OverwriteWithScale { scale: third },
        Task::PushKeyframe(Arc::new(shifted(&vm, 4.0))),
        Task::AccumulateAbsoluteBlend { scale: third },
        Task::PushKeyframe(Arc::new(shifted(&vm, 7.0))),
        Task::AccumulateAbsoluteBlend { scale: third },
        Task::NormalizeRotations,
    ]
    .into_iter()
    .collect();
    program.execute(&mut vm);
    assert_eq!(vm.keyframe_count(), 1);
    let out = vm.pop_keyframe().expect("result");
    approx3(out.pose.transforms[0].translation, [4.0, 0.0, 0.0], 1e-5);
    assert!(out.pose.transforms.iter().all(|t| t.is_rotation_normalized()));
}

#[test]
fn add_with_scale_accumulates_second_onto_top() {
    let mut vm = vm();
    let mut second = shifted(&vm, 2.0);
    second.scale_by(0.5);
    let mut top = shifted(&vm, 6.0);
    top.scale_by(0.5);
    vm.push_keyframe(second);
    vm.push_keyframe(top);
    Task::AddWithScale { scale: 1.0 }.execute(&mut vm);
    Task::NormalizeRotations.execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    approx3(out.pose.transforms[0].translation, [4.0, 0.0, 0.0], 1e-5);
}

#[test]
fn apply_additive_layers_delta_on_base() {
    let mut vm = vm();
    vm.push_keyframe(shifted(&vm, 1.0));
    let mut additive = vm.make_reference_keyframe(true);
    additive.pose.transforms[0].translation = [0.0, 2.0, 0.0];
    additive.curves.set("Blink", 1.0);
    vm.push_keyframe(additive);
    Task::ApplyAdditive { alpha: 0.5 }.execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    approx3(out.pose.transforms[0].translation, [1.0, 1.0, 0.0], 1e-6);
    approx3(out.pose.transforms[0].scale, [1.0, 1.0, 1.0], 1e-6);
    assert_eq!(out.curves.get("Blink"), Some(0.5));
    assert!(!out.is_additive);
}

#[test]
fn blend_per_bone_respects_mask() {
    let mut vm = vm();
    let mut a = vm.make_reference_keyframe(false);
    let mut b = vm.make_reference_keyframe(false);
    for t in a.pose.transforms.iter_mut() {
        t.translation = [0.0; 3];
    }
    for t in b.pose.transforms.iter_mut() {
        t.translation = [1.0, 0.0, 0.0];
    }
    b.curves.set("Breath", 1.0);
    let weights = PerBoneBlendWeights {
        bone_weights: vec![0.0, 0.0, 0.5, 1.0, 1.0],
        curve_weights: [("Breath".to_string(), 1.0)].into_iter().collect(),
        ..Default::default()
    };
    vm.push_keyframe(a);
    vm.push_keyframe(b);
    Task::BlendPerBone(posemix_eval_core::BlendPerBoneTask {
        weights: Arc::new(weights),
        blend_weight: 0.5,
    })
    .execute(&mut vm);
    let out = vm.pop_keyframe().expect("result");
    let xs: Vec<f32> = out.pose.transforms.iter().map(|t| t.translation[0]).collect();
    approx(xs[0], 0.0, 1e-6);
    approx(xs[1], 0.0, 1e-6);
    approx(xs[2], 0.25, 1e-6);
    approx(xs[3], 0.5, 1e-6);
    approx(xs[4], 0.5, 1e-6);
    assert_eq!(out.curves.get("Breath"), Some(0.5));
}

#[test]
fn nested_program_replays_against_current_vm() {
    let mut vm = vm();
    let inner: EvaluationProgram = [
        Task::PushReferencePose { additive: false },
        Task::OverwriteWithScale { scale: 1.0 },
    ]
    .into_iter()
    .collect();
    let inner = inner.freeze();
    let mut outer = EvaluationProgram::new();
    outer.append_task(Task::ExecuteProgram(inner.clone()));
    outer.append_task(Task::ExecuteProgram(inner));
    outer.append_task(Task::blend_two(0.5));
    outer.execute(&mut vm);
    assert_eq!(vm.keyframe_count(), 1);
    let out = vm.pop_keyframe().expect("result");
    assert_eq!(out, vm.make_reference_keyframe(false));
}

#[test]
fn sample_clip_overlays_reference_pose_and_emits_root_delta() {
    let mut vm = vm();
    let walk = clip("walk");
    walk.validate(vm.skeleton()).expect("walk fits biped");
    Task::SampleClip(SampleClipTask::new(walk, 0.5, true).with_previous_time(0.25))
        .execute(&mut vm);
    let out = vm.pop_keyframe().expect("sampled");
    approx3(out.pose.transforms[0].translation, [0.75, 0.0, 0.0], 1e-5);
    approx3(out.pose.transforms[1].translation, [0.0, 0.0, 0.95], 1e-5);
    // Bones without tracks keep the reference pose.
    approx3(out.pose.transforms[4].translation, [0.3, 0.0, 0.3], 1e-6);
    approx(out.curves.get("Footstep").expect("curve"), 1.0, 1e-6);
    let delta = out
        .attributes
        .get_transform(&AttributeId::root_motion_delta())
        .expect("root delta");
    approx3(delta.translation, [0.375, 0.0, 0.0], 1e-5);
}

#[test]
fn additive_clip_samples_over_additive_identity() {
    let mut vm = vm();
    Task::SampleClip(SampleClipTask::new(clip("wave-additive"), 0.0, false)).execute(&mut vm);
    let out = vm.pop_keyframe().expect("sampled");
    assert!(out.is_additive);
    assert_eq!(out.pose.transforms[0], Transform::ADDITIVE_IDENTITY);
    approx3(out.pose.transforms[4].translation, [0.0, 0.0, 0.2], 1e-6);
}

#[test]
fn lod_truncates_sampled_keyframes() {
    let cfg = VmConfig {
        lod: 1,
        ..VmConfig::default()
    };
    let mut vm = EvaluationVm::new(biped(), cfg);
    Task::SampleClip(SampleClipTask::new(clip("wave-additive"), 0.5, false)).execute(&mut vm);
    let out = vm.pop_keyframe().expect("sampled");
    assert_eq!(out.bone_count(), 4);
}

#[test]
#[should_panic(expected = "bone count")]
fn pushing_keyframe_of_other_topology_panics() {
    let cfg = VmConfig {
        lod: 1,
        ..VmConfig::default()
    };
    let mut vm = EvaluationVm::new(biped(), cfg);
    let full = EvaluationVm::new(biped(), VmConfig::default()).make_reference_keyframe(false);
    Task::PushKeyframe(Arc::new(full)).execute(&mut vm);
}

#[test]
fn int_attributes_step_at_half() {
    let mut vm = vm();
    let id = AttributeId::bone("Stance", 1);
    let mut a = vm.make_reference_keyframe(false);
    a.attributes.set(id.clone(), AttributeValue::Int(1));
    let mut b = vm.make_reference_keyframe(false);
    b.attributes.set(id.clone(), AttributeValue::Int(2));
    vm.push_keyframe(a.clone());
    vm.push_keyframe(b.clone());
    Task::blend_two(0.4).execute(&mut vm);
    assert_eq!(vm.pop_keyframe().expect("r").attributes.get_int(&id), Some(1));
    vm.push_keyframe(a);
    vm.push_keyframe(b);
    Task::blend_two(0.6).execute(&mut vm);
    assert_eq!(vm.pop_keyframe().expect("r").attributes.get_int(&id), Some(2));
}
