//! Pose nodes: per-tick update plus task emission into a program.
//!
//! Children are evaluated depth-first before their parent appends its own blend
//! tasks, so every blend finds its operands on top of the keyframe stack.

use std::sync::Arc;

use posemix_eval_core::{
    AnimationClip, EvaluationProgram, Keyframe, ReferenceSkeleton, SampleClipTask, Task,
};

/// Per-tick inputs handed down the node tree.
#[derive(Copy, Clone, Debug)]
pub struct UpdateContext<'a> {
    pub skeleton: &'a ReferenceSkeleton,
    /// Seconds since the previous update, already scaled by any parent play rate.
    pub delta_time: f32,
    /// The node starts contributing this tick; continuous state should be reset.
    pub newly_relevant: bool,
}

impl<'a> UpdateContext<'a> {
    pub fn new(skeleton: &'a ReferenceSkeleton, delta_time: f32) -> Self {
        Self {
            skeleton,
            delta_time,
            newly_relevant: false,
        }
    }

    pub fn with_delta_time(self, delta_time: f32) -> Self {
        Self { delta_time, ..self }
    }

    pub fn with_newly_relevant(self, newly_relevant: bool) -> Self {
        Self {
            newly_relevant,
            ..self
        }
    }
}

pub trait PoseNode: Send {
    fn update(&mut self, ctx: &UpdateContext<'_>);

    /// Append the tasks producing this node's pose. A node that appends nothing
    /// leaves the stack untouched (pass-through).
    fn evaluate(&self, program: &mut EvaluationProgram);
}

impl<N: PoseNode + ?Sized> PoseNode for Box<N> {
    fn update(&mut self, ctx: &UpdateContext<'_>) {
        (**self).update(ctx)
    }

    fn evaluate(&self, program: &mut EvaluationProgram) {
        (**self).evaluate(program)
    }
}

/// Plays one clip, advancing by `delta_time * play_rate` each tick.
#[derive(Clone, Debug)]
pub struct ClipPlayerNode {
    clip: Arc<AnimationClip>,
    time: f32,
    previous_time: Option<f32>,
    pub play_rate: f32,
    pub looping: bool,
    restart_when_relevant: bool,
}

impl ClipPlayerNode {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            previous_time: None,
            play_rate: 1.0,
            looping: true,
            restart_when_relevant: false,
        }
    }

    pub fn with_play_rate(mut self, play_rate: f32) -> Self {
        self.play_rate = play_rate;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Rewind to the start whenever the player becomes relevant again.
    pub fn restart_when_relevant(mut self) -> Self {
        self.restart_when_relevant = true;
        self
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn previous_time(&self) -> Option<f32> {
        self.previous_time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
        self.previous_time = None;
    }
}

impl PoseNode for ClipPlayerNode {
    fn update(&mut self, ctx: &UpdateContext<'_>) {
        if ctx.newly_relevant && self.restart_when_relevant {
            self.time = 0.0;
        }
        let start = self.time;
        let mut time = start + ctx.delta_time * self.play_rate;
        if !self.looping {
            time = time.clamp(0.0, self.clip.duration.max(0.0));
        }
        self.time = time;
        self.previous_time = Some(start);
    }

    fn evaluate(&self, program: &mut EvaluationProgram) {
        let mut task = SampleClipTask::new(self.clip.clone(), self.time, self.looping);
        if let Some(previous) = self.previous_time {
            task = task.with_previous_time(previous);
        }
        program.append_task(Task::SampleClip(task));
    }
}

/// Emits a fixed keyframe, or the reference pose when none is set.
#[derive(Clone, Debug, Default)]
pub struct KeyframeNode {
    keyframe: Option<Arc<Keyframe>>,
}

impl KeyframeNode {
    pub fn new(keyframe: Keyframe) -> Self {
        Self {
            keyframe: Some(Arc::new(keyframe)),
        }
    }

    pub fn reference_pose() -> Self {
        Self::default()
    }

    pub fn set_keyframe(&mut self, keyframe: Option<Arc<Keyframe>>) {
        self.keyframe = keyframe;
    }
}

impl PoseNode for KeyframeNode {
    fn update(&mut self, _ctx: &UpdateContext<'_>) {}

    fn evaluate(&self, program: &mut EvaluationProgram) {
        let task = match &self.keyframe {
            Some(keyframe) => Task::PushKeyframe(keyframe.clone()),
            None => Task::PushReferencePose { additive: false },
        };
        program.append_task(task);
    }
}
