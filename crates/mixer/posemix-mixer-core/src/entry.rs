//! Mixer entries: one contributing pose source each.

use std::sync::Arc;

use posemix_eval_core::{RootMotionConversion, Task, Transform};

/// Root motion handling requested by an entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RootMotionSettings {
    /// Explicit root transform that replaces the pose's root bone.
    pub root_override: Option<Transform>,
    /// World offset applied after conversion.
    pub transform_origin: Option<Transform>,
}

impl RootMotionSettings {
    /// Conversion flags for this entry on a mixer whose component may carry a keyed transform.
    pub fn conversion_flags(&self, component_has_keyed_transform: bool) -> RootMotionConversion {
        let mut flags = RootMotionConversion::NONE;
        if self.root_override.is_some() {
            flags |= RootMotionConversion::APPLY_ROOT_OVERRIDE;
        }
        if component_has_keyed_transform {
            flags |= RootMotionConversion::COMPONENT_HAS_KEYED_TRANSFORM;
        }
        if self.transform_origin.is_some() {
            flags |= RootMotionConversion::APPLY_TRANSFORM_ORIGIN;
        }
        flags
    }
}

#[derive(Clone, Debug)]
pub struct MixerEntry {
    /// Task producing this entry's keyframe. `None` entries are left out of the program.
    pub task: Option<Arc<Task>>,
    pub priority: i32,
    pub weight: f32,
    pub additive: bool,
    /// When false, the task composites onto the stack by itself and no blend task follows it.
    pub requires_blend: bool,
    pub root_motion: Option<RootMotionSettings>,
}

impl MixerEntry {
    pub fn new(task: Task, priority: i32, weight: f32) -> Self {
        Self {
            task: Some(Arc::new(task)),
            priority,
            weight,
            additive: false,
            requires_blend: true,
            root_motion: None,
        }
    }

    pub fn additive(mut self) -> Self {
        self.additive = true;
        self
    }

    pub fn with_root_motion(mut self, settings: RootMotionSettings) -> Self {
        self.root_motion = Some(settings);
        self
    }

    pub fn without_blend(mut self) -> Self {
        self.requires_blend = false;
        self
    }
}
