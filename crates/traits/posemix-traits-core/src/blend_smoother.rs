//! Time-based discrete blending between mutually exclusive children.
//!
//! One child is the target at a time. A transition fades the old target out and
//! the new one in over the same remaining time; children whose weight reaches
//! zero are terminated. Evaluation blends every child that still has a blend
//! record.

use serde::{Deserialize, Serialize};

use posemix_api_core::tolerance::{is_nearly_equal, KINDA_SMALL_NUMBER};
use posemix_eval_core::{EvaluationProgram, Task};

use crate::alpha_blend::{AlphaBlend, AlphaBlendOption};
use crate::node::{PoseNode, UpdateContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendSmootherSettings {
    /// Seconds for a full 0 -> 1 transition.
    pub blend_time: f32,
    pub option: AlphaBlendOption,
    /// Weights below this snap to exactly zero.
    pub relevance_epsilon: f32,
}

impl Default for BlendSmootherSettings {
    fn default() -> Self {
        Self {
            blend_time: 0.2,
            option: AlphaBlendOption::Linear,
            relevance_epsilon: KINDA_SMALL_NUMBER,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChildBlendState {
    Inactive,
    BlendingIn,
    /// Reached its desired weight; still blended until terminated.
    Steady,
    BlendingOut,
    /// Terminated during the last update. Reads as `Inactive` after the next one.
    Terminated,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SmootherEvent {
    BlendStarted { child: usize },
    Terminated { child: usize },
}

#[derive(Debug)]
struct ChildBlend {
    blend: AlphaBlend,
    weight: f32,
    newly_relevant: bool,
}

struct ChildSlot {
    node: Box<dyn PoseNode>,
    blend: Option<ChildBlend>,
    state: ChildBlendState,
}

pub struct BlendSmoother {
    settings: BlendSmootherSettings,
    slots: Vec<ChildSlot>,
    target: Option<usize>,
    events: Vec<SmootherEvent>,
}

impl BlendSmoother {
    pub fn new(settings: BlendSmootherSettings) -> Self {
        Self {
            settings,
            slots: Vec::new(),
            target: None,
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &BlendSmootherSettings {
        &self.settings
    }

    /// Register a child; returns its index.
    pub fn add_child(&mut self, node: Box<dyn PoseNode>) -> usize {
        self.slots.push(ChildSlot {
            node,
            blend: None,
            state: ChildBlendState::Inactive,
        });
        self.slots.len() - 1
    }

    pub fn with_child(mut self, node: impl PoseNode + 'static) -> Self {
        self.add_child(Box::new(node));
        self
    }

    pub fn child_count(&self) -> usize {
        self.slots.len()
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn child_state(&self, child: usize) -> ChildBlendState {
        self.slots
            .get(child)
            .map_or(ChildBlendState::Inactive, |slot| slot.state)
    }

    pub fn child_weight(&self, child: usize) -> f32 {
        self.slots
            .get(child)
            .and_then(|slot| slot.blend.as_ref())
            .map_or(0.0, |b| b.weight)
    }

    /// Blend time the child is currently finishing its blend over.
    pub fn child_blend_time(&self, child: usize) -> Option<f32> {
        self.slots
            .get(child)
            .and_then(|slot| slot.blend.as_ref())
            .map(|b| b.blend.blend_time())
    }

    /// `(child, weight)` for every child with a blend record, in child order.
    pub fn active_weights(&self) -> Vec<(usize, f32)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.blend.as_ref().map(|b| (i, b.weight)))
            .collect()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SmootherEvent> + '_ {
        self.events.drain(..)
    }

    pub fn on_blend_transition(&mut self, old: Option<usize>, new: usize) {
        let (blend_time, option) = (self.settings.blend_time, self.settings.option);
        self.on_blend_transition_with(old, new, blend_time, option);
    }

    /// Make `new` the target, fading `old` out. The remaining time shrinks with
    /// the weight `new` already has, so interrupted blends keep their speed.
    pub fn on_blend_transition_with(
        &mut self,
        old: Option<usize>,
        new: usize,
        blend_time: f32,
        option: AlphaBlendOption,
    ) {
        let Some(slot) = self.slots.get_mut(new) else {
            log::warn!("blend transition to unknown child {new} ignored");
            return;
        };
        let child = slot.blend.get_or_insert_with(|| {
            log::debug!("blend smoother: child {new} starts blending");
            ChildBlend {
                blend: AlphaBlend::new(blend_time, option),
                weight: 0.0,
                newly_relevant: true,
            }
        });
        let current = child.weight;
        let remaining = blend_time * (1.0 - current).abs().clamp(0.0, 1.0);
        child.blend.set_option(option);
        child.blend.set_value(current);
        child.blend.set_desired(1.0);
        slot.state = ChildBlendState::BlendingIn;
        self.events.push(SmootherEvent::BlendStarted { child: new });

        if let Some(old) = old.filter(|o| *o != new) {
            if let Some(slot) = self.slots.get_mut(old) {
                if let Some(child) = slot.blend.as_mut() {
                    child.blend.set_value(child.weight);
                    child.blend.set_desired(0.0);
                    slot.state = ChildBlendState::BlendingOut;
                }
            }
        }

        for slot in &mut self.slots {
            if let Some(child) = slot.blend.as_mut() {
                child.blend.set_blend_time(remaining);
            }
        }
        log::debug!(
            "blend smoother transition {old:?} -> {new}, remaining {remaining:.3}s"
        );
        self.target = Some(new);
    }
}

impl PoseNode for BlendSmoother {
    fn update(&mut self, ctx: &UpdateContext<'_>) {
        let epsilon = self.settings.relevance_epsilon;
        let mut active = 0usize;
        let mut sum = 0.0f32;
        for slot in &mut self.slots {
            if slot.state == ChildBlendState::Terminated {
                slot.state = ChildBlendState::Inactive;
            }
            if let Some(child) = slot.blend.as_mut() {
                let mut weight = child.blend.update(ctx.delta_time);
                if weight < epsilon {
                    weight = 0.0;
                }
                child.weight = weight;
                active += 1;
                sum += weight;
            }
        }

        if active >= 2
            && !is_nearly_equal(sum, 0.0, KINDA_SMALL_NUMBER)
            && !is_nearly_equal(sum, 1.0, KINDA_SMALL_NUMBER)
        {
            for child in self.slots.iter_mut().filter_map(|s| s.blend.as_mut()) {
                child.weight /= sum;
            }
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(child) = slot.blend.as_mut() else {
                continue;
            };
            if child.weight == 0.0 && self.target != Some(index) {
                slot.blend = None;
                slot.state = ChildBlendState::Terminated;
                self.events.push(SmootherEvent::Terminated { child: index });
                log::debug!("blend smoother: child {index} terminated");
                continue;
            }
            slot.state = if child.blend.desired() <= 0.0 {
                ChildBlendState::BlendingOut
            } else if child.blend.is_complete() {
                ChildBlendState::Steady
            } else {
                ChildBlendState::BlendingIn
            };
            let newly_relevant = ctx.newly_relevant || child.newly_relevant;
            child.newly_relevant = false;
            slot.node
                .update(&ctx.with_newly_relevant(newly_relevant));
        }
    }

    fn evaluate(&self, program: &mut EvaluationProgram) {
        let active: Vec<(&ChildSlot, f32)> = self
            .slots
            .iter()
            .filter_map(|slot| slot.blend.as_ref().map(|b| (slot, b.weight)))
            .collect();
        if active.len() < 2 {
            if let Some((slot, _)) = active.first() {
                slot.node.evaluate(program);
            }
            return;
        }
        for (slot, _) in &active {
            slot.node.evaluate(program);
        }
        // The last child evaluated sits on top of the stack and anchors the sum.
        let mut reversed = active.iter().rev();
        if let Some((_, weight)) = reversed.next() {
            program.append_task(Task::OverwriteWithScale { scale: *weight });
        }
        for (_, weight) in reversed {
            program.append_task(Task::AddWithScale { scale: *weight });
        }
        program.append_task(Task::NormalizeRotations);
    }
}
