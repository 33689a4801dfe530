//! Evaluation VM: named LIFO stacks of keyframes plus keyframe factories.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::config::VmConfig;
use crate::keyframe::{Keyframe, Pose};
use crate::skeleton::ReferenceSkeleton;
use posemix_api_core::Transform;

/// Owns the keyframe stacks a program executes against.
///
/// One VM serves one evaluation pass for one object; tasks run strictly in order
/// against it.
#[derive(Debug)]
pub struct EvaluationVm {
    cfg: VmConfig,
    skeleton: Arc<ReferenceSkeleton>,
    bone_count: usize,
    stacks: HashMap<String, Vec<Keyframe>>,
}

impl EvaluationVm {
    pub fn new(skeleton: Arc<ReferenceSkeleton>, cfg: VmConfig) -> Self {
        let bone_count = skeleton.bone_count_for_lod(cfg.lod);
        let mut stacks = HashMap::new();
        stacks.insert(
            cfg.default_stack.clone(),
            Vec::with_capacity(cfg.stack_capacity),
        );
        Self {
            cfg,
            skeleton,
            bone_count,
            stacks,
        }
    }

    pub fn skeleton(&self) -> &ReferenceSkeleton {
        &self.skeleton
    }

    pub fn config(&self) -> &VmConfig {
        &self.cfg
    }

    /// Bones per keyframe at the configured LOD.
    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    pub fn push_value(&mut self, stack: &str, keyframe: Keyframe) {
        let capacity = self.cfg.stack_capacity;
        self.stacks
            .entry_ref(stack)
            .or_insert_with(|| Vec::with_capacity(capacity))
            .push(keyframe);
    }

    /// Pop the top of `stack`. An empty or unknown stack yields `None`.
    pub fn pop_value(&mut self, stack: &str) -> Option<Keyframe> {
        self.stacks.get_mut(stack).and_then(Vec::pop)
    }

    /// Look at the keyframe `depth` slots below the top (0 is the top).
    pub fn peek_value(&self, stack: &str, depth: usize) -> Option<&Keyframe> {
        let values = self.stacks.get(stack)?;
        let index = values.len().checked_sub(depth + 1)?;
        values.get(index)
    }

    pub fn stack_len(&self, stack: &str) -> usize {
        self.stacks.get(stack).map_or(0, Vec::len)
    }

    #[inline]
    pub fn push_keyframe(&mut self, keyframe: Keyframe) {
        let capacity = self.cfg.stack_capacity;
        self.stacks
            .entry_ref(self.cfg.default_stack.as_str())
            .or_insert_with(|| Vec::with_capacity(capacity))
            .push(keyframe);
    }

    #[inline]
    pub fn pop_keyframe(&mut self) -> Option<Keyframe> {
        self.stacks.get_mut(&self.cfg.default_stack).and_then(Vec::pop)
    }

    #[inline]
    pub fn peek_keyframe(&self, depth: usize) -> Option<&Keyframe> {
        self.peek_value(&self.cfg.default_stack, depth)
    }

    #[inline]
    pub fn keyframe_count(&self) -> usize {
        self.stack_len(&self.cfg.default_stack)
    }

    /// Keyframe sized for this VM with neutral transforms (identity, or the
    /// additive identity for additive keyframes).
    pub fn make_uninitialized_keyframe(&self, is_additive: bool) -> Keyframe {
        Keyframe::new(
            Pose::filled(self.bone_count, Transform::identity_for(is_additive)),
            is_additive,
        )
    }

    /// Keyframe holding the reference pose, or the additive identity for additive keyframes.
    pub fn make_reference_keyframe(&self, is_additive: bool) -> Keyframe {
        if is_additive {
            return self.make_uninitialized_keyframe(true);
        }
        Keyframe::new(
            Pose {
                transforms: self.skeleton.reference_pose[..self.bone_count].to_vec(),
            },
            false,
        )
    }

    /// Drop every keyframe on every stack.
    pub fn clear(&mut self) {
        for values in self.stacks.values_mut() {
            values.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> Arc<ReferenceSkeleton> {
        let pose = vec![
            Transform::from_translation([0.0, 0.0, 1.0]),
            Transform::from_translation([0.0, 1.0, 0.0]),
            Transform::from_translation([1.0, 0.0, 0.0]),
        ];
        Arc::new(
            ReferenceSkeleton::new(
                "tri",
                vec!["root".into(), "spine".into(), "head".into()],
                vec![-1, 0, 1],
                pose,
            )
            .and_then(|s| s.with_lods(vec![2]))
            .expect("valid skeleton"),
        )
    }

    #[test]
    fn pop_on_empty_stack_is_none() {
        let mut vm = EvaluationVm::new(skeleton(), VmConfig::default());
        assert!(vm.pop_keyframe().is_none());
        assert!(vm.pop_value("missing").is_none());
    }

    #[test]
    fn stacks_are_lifo_and_named() {
        let mut vm = EvaluationVm::new(skeleton(), VmConfig::default());
        let a = vm.make_reference_keyframe(false);
        let b = vm.make_uninitialized_keyframe(false);
        vm.push_keyframe(a.clone());
        vm.push_keyframe(b.clone());
        vm.push_value("scratch", a.clone());
        assert_eq!(vm.peek_keyframe(0), Some(&b));
        assert_eq!(vm.peek_keyframe(1), Some(&a));
        assert_eq!(vm.peek_keyframe(2), None);
        assert_eq!(vm.stack_len("scratch"), 1);
        assert_eq!(vm.pop_keyframe(), Some(b));
        assert_eq!(vm.pop_keyframe(), Some(a));
    }

    #[test]
    fn keyframes_follow_lod_and_additive_convention() {
        let cfg = VmConfig {
            lod: 1,
            ..VmConfig::default()
        };
        let vm = EvaluationVm::new(skeleton(), cfg);
        let reference = vm.make_reference_keyframe(false);
        assert_eq!(reference.bone_count(), 2);
        assert_eq!(reference.pose.transforms[1].translation, [0.0, 1.0, 0.0]);
        let additive = vm.make_reference_keyframe(true);
        assert!(additive.is_additive);
        assert_eq!(additive.pose.transforms[0], Transform::ADDITIVE_IDENTITY);
    }
}
