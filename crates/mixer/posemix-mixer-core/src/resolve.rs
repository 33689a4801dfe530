//! Priority-grouped resolution of mixer entries into an evaluation program.
//!
//! The program expects a base pose on the stack and leaves the blended pose there.
//!
//! Per priority band (ascending; additives after absolutes within a band):
//! - one absolute contributor, or band weights summing to ~0 or ~1: each absolute is
//!   blended onto the running pose with `BlendTwoPreserveRootMotion(weight)`;
//! - otherwise the absolutes are averaged on top of the stack
//!   (`OverwriteWithScale` for the first, `AccumulateAbsoluteBlend` for the rest,
//!   both scaled by `weight / band_total`), normalized, and merged onto the running
//!   pose with `BlendTwoPreserveRootMotion(1.0)`;
//! - additives follow with `ApplyAdditive(weight)`.
//!
//! Entries with `requires_blend == false` composite onto the stack themselves: no
//! blend task follows them and they never join the weighted average.

use std::sync::Arc;

use posemix_api_core::tolerance::is_nearly_equal;
use posemix_eval_core::{
    ConvertRootMotionTask, EvaluationProgram, SharedRootMotion, StoreRootTransformTask, Task,
};

use crate::config::MixerConfig;
use crate::entry::MixerEntry;

/// Root motion state the resolved program writes to.
#[derive(Clone, Debug)]
pub struct RootMotionPlan {
    pub data: SharedRootMotion,
    pub component_has_keyed_transform: bool,
    pub root_component_has_keyed_transform: bool,
}

/// Look-ahead summary of one priority band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandSummary {
    /// Sum of the counted absolute weights.
    pub total_weight: f32,
    /// Absolute entries whose weight changed the running total.
    pub contributors: usize,
    pub needs_separate_stack: bool,
}

impl BandSummary {
    pub fn analyze(band: &[&MixerEntry], epsilon: f32) -> Self {
        let mut total_weight = 0.0f32;
        let mut contributors = 0usize;
        for entry in band.iter().filter(|e| is_blended_absolute(e)) {
            let new_total = total_weight + entry.weight;
            if !is_nearly_equal(new_total, total_weight, epsilon) {
                contributors += 1;
                total_weight = new_total;
            }
        }
        let needs_separate_stack = contributors > 1
            && !is_nearly_equal(total_weight, 0.0, epsilon)
            && !is_nearly_equal(total_weight, 1.0, epsilon);
        Self {
            total_weight,
            contributors,
            needs_separate_stack,
        }
    }
}

fn is_blended_absolute(entry: &MixerEntry) -> bool {
    !entry.additive && entry.requires_blend && entry.task.is_some()
}

/// Stable sort by priority, additives last within a priority.
pub fn sort_entries(entries: &mut [&MixerEntry]) {
    entries.sort_by_key(|e| (e.priority, e.additive));
}

fn merge_band(program: &mut EvaluationProgram) {
    program.append_task(Task::NormalizeRotations);
    program.append_task(Task::blend_two_preserve_root_motion(1.0));
}

/// Append the entry's task and, when root motion is tracked, its conversion.
/// Returns false for entries without a task.
fn append_source(
    program: &mut EvaluationProgram,
    entry: &MixerEntry,
    root_motion: Option<&RootMotionPlan>,
) -> bool {
    let Some(task) = &entry.task else {
        return false;
    };
    program.append_task_ptr(Arc::clone(task));
    if let (Some(settings), Some(plan)) = (&entry.root_motion, root_motion) {
        program.append_task(Task::ConvertRootMotionToWorldSpace(ConvertRootMotionTask {
            root_motion: plan.data.clone(),
            flags: settings.conversion_flags(plan.component_has_keyed_transform),
            root_override: settings.root_override,
            transform_origin: settings.transform_origin,
        }));
    }
    true
}

/// Blend task following an entry outside the weighted average.
fn append_blend(program: &mut EvaluationProgram, entry: &MixerEntry) {
    if !entry.requires_blend {
        return;
    }
    if entry.additive {
        program.append_task(Task::ApplyAdditive {
            alpha: entry.weight,
        });
    } else {
        program.append_task(Task::blend_two_preserve_root_motion(entry.weight));
    }
}

fn append_band(
    program: &mut EvaluationProgram,
    band: &[&MixerEntry],
    root_motion: Option<&RootMotionPlan>,
    cfg: &MixerConfig,
) {
    let summary = BandSummary::analyze(band, cfg.duplicate_weight_epsilon);
    if !summary.needs_separate_stack {
        for entry in band {
            if append_source(program, entry, root_motion) {
                append_blend(program, entry);
            }
        }
        return;
    }

    // Averaged absolutes first, then self-compositing entries and additives on the
    // merged result, each group in band order.
    let mut averaged = 0usize;
    for entry in band.iter().filter(|e| {
        is_blended_absolute(e) && !is_nearly_equal(e.weight, 0.0, cfg.duplicate_weight_epsilon)
    }) {
        if !append_source(program, entry, root_motion) {
            continue;
        }
        let scale = entry.weight / summary.total_weight;
        if averaged == 0 {
            program.append_task(Task::OverwriteWithScale { scale });
        } else {
            program.append_task(Task::AccumulateAbsoluteBlend { scale });
        }
        averaged += 1;
    }
    if averaged > 0 {
        merge_band(program);
    }
    for entry in band.iter().filter(|e| e.additive || !e.requires_blend) {
        if append_source(program, entry, root_motion) {
            append_blend(program, entry);
        }
    }
}

/// Build the program for one mixer from its live entries (any order).
pub fn resolve(
    entries: &[&MixerEntry],
    root_motion: Option<&RootMotionPlan>,
    cfg: &MixerConfig,
) -> EvaluationProgram {
    let mut sorted = entries.to_vec();
    sort_entries(&mut sorted);

    let mut program = EvaluationProgram::with_capacity(sorted.len() * 2 + 1);
    let mut start = 0;
    while start < sorted.len() {
        let priority = sorted[start].priority;
        let len = sorted[start..]
            .iter()
            .take_while(|e| e.priority == priority)
            .count();
        append_band(&mut program, &sorted[start..start + len], root_motion, cfg);
        start += len;
    }

    if let Some(plan) = root_motion {
        program.append_task(Task::StoreRootTransform(StoreRootTransformTask {
            root_motion: plan.data.clone(),
            component_has_keyed_transform: plan.component_has_keyed_transform,
            root_component_has_keyed_transform: plan.root_component_has_keyed_transform,
        }));
    }
    log::debug!("resolved {} mixer entries into: {}", entries.len(), program);
    program
}
