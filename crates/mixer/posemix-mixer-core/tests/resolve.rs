use std::sync::Arc;

use posemix_eval_core::{
    EvaluationProgram, EvaluationVm, Keyframe, Pose, ReferenceSkeleton, Task, Transform, VmConfig,
};
use posemix_mixer_core::{evaluate_target, resolve, MixerConfig, MixerEntry};

fn approx3(a: [f32; 3], b: [f32; 3], eps: f32) {
    for i in 0..3 {
        assert!(
            (a[i] - b[i]).abs() <= eps,
            "approx failed: left={a:?} right={b:?} eps={eps}"
        );
    }
}

fn skeleton() -> Arc<ReferenceSkeleton> {
    Arc::new(
        ReferenceSkeleton::new(
            "pair",
            vec!["root".into(), "child".into()],
            vec![-1, 0],
            vec![Transform::IDENTITY; 2],
        )
        .expect("valid skeleton"),
    )
}

/// Pose source whose root sits at `root` and which carries a "Tag" curve for identification.
fn source(tag: f32, root: [f32; 3], additive: bool) -> Task {
    let base = Transform::identity_for(additive);
    let mut kf = Keyframe::new(Pose::filled(2, base), additive);
    kf.pose.transforms[0].translation = root;
    kf.curves.set("Tag", tag);
    Task::PushKeyframe(Arc::new(kf))
}

fn tags(program: &EvaluationProgram) -> Vec<f32> {
    program
        .tasks()
        .filter_map(|task| match task {
            Task::PushKeyframe(kf) => kf.curves.get("Tag"),
            _ => None,
        })
        .collect()
}

fn run(program: EvaluationProgram) -> Keyframe {
    let mut vm = EvaluationVm::new(skeleton(), VmConfig::default());
    let base = vm.make_reference_keyframe(false);
    evaluate_target(&mut vm, base, &Task::ExecuteProgram(program.freeze()))
}

#[test]
fn bands_resolve_by_priority_then_additive_last() {
    let entries = [
        MixerEntry::new(source(2.0, [0.0; 3], false), 2, 1.0),
        MixerEntry::new(source(0.0, [0.0; 3], false), 0, 1.0),
        MixerEntry::new(source(1.0, [0.0; 3], false), 1, 1.0),
        MixerEntry::new(source(0.5, [0.0; 3], true), 0, 1.0).additive(),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(tags(&program), vec![0.0, 0.5, 1.0, 2.0]);

    // Insertion order does not matter.
    let reversed: Vec<&MixerEntry> = entries.iter().rev().collect();
    let program = resolve(&reversed, None, &MixerConfig::default());
    assert_eq!(tags(&program), vec![0.0, 0.5, 1.0, 2.0]);
}

#[test]
fn band_summing_to_one_uses_sequential_blends() {
    let entries = [
        MixerEntry::new(source(0.0, [0.0; 3], false), 0, 0.2),
        MixerEntry::new(source(1.0, [0.0; 3], false), 0, 0.3),
        MixerEntry::new(source(2.0, [0.0; 3], false), 0, 0.5),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(
        program.task_names(),
        vec![
            "PushKeyframe",
            "BlendTwoPreserveRootMotion",
            "PushKeyframe",
            "BlendTwoPreserveRootMotion",
            "PushKeyframe",
            "BlendTwoPreserveRootMotion",
        ]
    );
}

#[test]
fn partial_band_weights_use_weighted_average_stack() {
    let entries = [
        MixerEntry::new(source(0.0, [3.0, 0.0, 0.0], false), 0, 0.2),
        MixerEntry::new(source(1.0, [6.0, 0.0, 0.0], false), 0, 0.2),
        MixerEntry::new(source(2.0, [9.0, 0.0, 0.0], false), 0, 0.2),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(
        program.task_names(),
        vec![
            "PushKeyframe",
            "OverwriteWithScale",
            "PushKeyframe",
            "AccumulateAbsoluteBlend",
            "PushKeyframe",
            "AccumulateAbsoluteBlend",
            "NormalizeRotations",
            "BlendTwoPreserveRootMotion",
        ]
    );
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [6.0, 0.0, 0.0], 1e-4);
}

#[test]
fn zero_weight_entries_are_skipped_in_averaged_band() {
    let entries = [
        MixerEntry::new(source(0.0, [2.0, 0.0, 0.0], false), 0, 0.3),
        MixerEntry::new(source(1.0, [100.0, 0.0, 0.0], false), 0, 0.0),
        MixerEntry::new(source(2.0, [4.0, 0.0, 0.0], false), 0, 0.3),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(tags(&program), vec![0.0, 2.0]);
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [3.0, 0.0, 0.0], 1e-4);
}

#[test]
fn additives_in_averaged_band_apply_after_the_merge() {
    let entries = [
        MixerEntry::new(source(0.0, [2.0, 0.0, 0.0], false), 0, 0.2),
        MixerEntry::new(source(1.0, [0.0, 0.0, 1.0], true), 0, 1.0).additive(),
        MixerEntry::new(source(2.0, [4.0, 0.0, 0.0], false), 0, 0.2),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(
        program.task_names(),
        vec![
            "PushKeyframe",
            "OverwriteWithScale",
            "PushKeyframe",
            "AccumulateAbsoluteBlend",
            "NormalizeRotations",
            "BlendTwoPreserveRootMotion",
            "PushKeyframe",
            "ApplyAdditive",
        ]
    );
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [3.0, 0.0, 1.0], 1e-4);
}

#[test]
fn base_layer_partial_blend_and_additive_end_to_end() {
    let entries = [
        MixerEntry::new(source(0.0, [1.0, 0.0, 0.0], false), 0, 1.0),
        MixerEntry::new(source(1.0, [6.0, 0.0, 0.0], false), 1, 0.4),
        MixerEntry::new(source(2.0, [0.0, 0.0, 2.0], true), 1, 1.0).additive(),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    let rendered: Vec<String> = program.tasks().map(|t| t.to_string()).collect();
    assert_eq!(
        rendered,
        vec![
            "PushKeyframe",
            "BlendTwoPreserveRootMotion(1.0000)",
            "PushKeyframe",
            "BlendTwoPreserveRootMotion(0.4000)",
            "PushKeyframe",
            "ApplyAdditive(1.0000)",
        ]
    );
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [3.0, 0.0, 2.0], 1e-5);
    // Curves follow the same blend: 0 -> 1 by 0.4, then the additive adds 2.
    assert!((out.curves.get("Tag").expect("tag") - 2.4).abs() < 1e-5);
}

#[test]
fn null_tasks_are_left_out() {
    let mut silent = MixerEntry::new(source(9.0, [0.0; 3], false), 0, 0.5);
    silent.task = None;
    let entries = [silent, MixerEntry::new(source(1.0, [0.0; 3], false), 0, 0.5)];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(tags(&program), vec![1.0]);
    assert_eq!(
        program.task_names(),
        vec!["PushKeyframe", "BlendTwoPreserveRootMotion"]
    );
}

#[test]
fn entries_without_blend_composite_themselves() {
    let inner: EvaluationProgram = [source(0.0, [4.0, 0.0, 0.0], false), Task::blend_two(0.5)]
        .into_iter()
        .collect();
    let entries = [
        MixerEntry::new(Task::ExecuteProgram(inner.freeze()), 0, 1.0).without_blend(),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(program.task_names(), vec!["ExecuteProgram"]);
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [2.0, 0.0, 0.0], 1e-6);
}

#[test]
fn epsilon_from_json_config_widens_the_simple_path() {
    let cfg: MixerConfig =
        serde_json::from_str(r#"{"duplicate_weight_epsilon": 0.05}"#).expect("config parses");
    assert!(cfg.cache_programs);
    let entries = [
        MixerEntry::new(source(0.0, [0.0; 3], false), 0, 0.5),
        MixerEntry::new(source(1.0, [0.0; 3], false), 0, 0.47),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();

    let strict = resolve(&refs, None, &MixerConfig::default());
    assert!(strict.task_names().contains(&"OverwriteWithScale"));
    let loose = resolve(&refs, None, &cfg);
    assert_eq!(
        loose.task_names(),
        vec![
            "PushKeyframe",
            "BlendTwoPreserveRootMotion",
            "PushKeyframe",
            "BlendTwoPreserveRootMotion",
        ]
    );
}

/// Frozen program that pushes `source` and composites it with `blend`.
fn self_compositing(source: Task, blend: Task) -> Task {
    let inner: EvaluationProgram = [source, blend].into_iter().collect();
    Task::ExecuteProgram(inner.freeze())
}

#[test]
fn self_compositing_absolute_runs_after_the_averaged_merge() {
    let entries = [
        MixerEntry::new(source(0.0, [2.0, 0.0, 0.0], false), 0, 0.2),
        MixerEntry::new(
            self_compositing(source(1.0, [10.0, 0.0, 0.0], false), Task::blend_two(0.5)),
            0,
            0.2,
        )
        .without_blend(),
        MixerEntry::new(source(2.0, [4.0, 0.0, 0.0], false), 0, 0.2),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(
        program.task_names(),
        vec![
            "PushKeyframe",
            "OverwriteWithScale",
            "PushKeyframe",
            "AccumulateAbsoluteBlend",
            "NormalizeRotations",
            "BlendTwoPreserveRootMotion",
            "ExecuteProgram",
        ]
    );
    // Average of 2 and 4, then halfway toward 10.
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [6.5, 0.0, 0.0], 1e-4);
}

#[test]
fn entries_without_blend_get_no_blend_task_and_no_average() {
    let entries = [
        MixerEntry::new(source(0.0, [4.0, 0.0, 0.0], false), 0, 0.2),
        MixerEntry::new(
            self_compositing(source(1.0, [8.0, 0.0, 0.0], false), Task::blend_two(0.5)),
            0,
            0.2,
        )
        .without_blend(),
        MixerEntry::new(
            self_compositing(
                source(2.0, [0.0, 0.0, 2.0], true),
                Task::ApplyAdditive { alpha: 0.5 },
            ),
            0,
            1.0,
        )
        .additive()
        .without_blend(),
    ];
    let refs: Vec<&MixerEntry> = entries.iter().collect();
    let program = resolve(&refs, None, &MixerConfig::default());
    assert_eq!(
        program.task_names(),
        vec![
            "PushKeyframe",
            "BlendTwoPreserveRootMotion",
            "ExecuteProgram",
            "ExecuteProgram",
        ]
    );
    // 0 -> 4 by 0.2 gives 0.8; halfway to 8 gives 4.4; the additive adds 1 on z.
    let out = run(program);
    approx3(out.pose.transforms[0].translation, [4.4, 0.0, 1.0], 1e-4);
}

#[test]
fn empty_program_passes_base_through() {
    let program = resolve(&[], None, &MixerConfig::default());
    assert!(program.is_empty());
    let out = run(program);
    assert_eq!(out.pose.transforms[0], Transform::IDENTITY);
}
