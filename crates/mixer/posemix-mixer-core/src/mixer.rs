//! Per (object, target) mixer state.

use std::sync::Arc;

use posemix_eval_core::{EvaluationProgram, RootMotionData, RootMotionDestination, SharedRootMotion};

use crate::ids::EntryHandle;
use crate::resolve::RootMotionPlan;

/// Result of an entry mutation, telling the caller whether re-resolution is due.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum MixerChange {
    Unchanged,
    /// The mixer's program is out of date and will be re-resolved on the next pass.
    Dirty,
    /// The last entry left; the mixer and its program were removed.
    TornDown,
}

#[derive(Debug)]
pub struct Mixer {
    pub(crate) entries: Vec<EntryHandle>,
    pub(crate) program: Option<Arc<EvaluationProgram>>,
    pub(crate) root_motion: Option<SharedRootMotion>,
    pub(crate) destination: RootMotionDestination,
    pub(crate) component_has_keyed_transform: bool,
    pub(crate) root_component_has_keyed_transform: bool,
    pub(crate) dirty: bool,
}

impl Default for Mixer {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            program: None,
            root_motion: None,
            destination: RootMotionDestination::default(),
            component_has_keyed_transform: false,
            root_component_has_keyed_transform: false,
            dirty: true,
        }
    }
}

impl Mixer {
    pub fn entries(&self) -> &[EntryHandle] {
        &self.entries
    }

    /// Last resolved program, if any.
    pub fn program(&self) -> Option<&Arc<EvaluationProgram>> {
        self.program.as_ref()
    }

    pub fn root_motion(&self) -> Option<&SharedRootMotion> {
        self.root_motion.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) -> MixerChange {
        self.dirty = true;
        MixerChange::Dirty
    }

    /// Create the shared root motion data the first time an entry asks for it.
    pub(crate) fn ensure_root_motion(&mut self) -> &SharedRootMotion {
        let destination = self.destination;
        self.root_motion
            .get_or_insert_with(|| RootMotionData::shared(destination))
    }

    pub(crate) fn root_motion_plan(&self) -> Option<RootMotionPlan> {
        self.root_motion.as_ref().map(|data| RootMotionPlan {
            data: data.clone(),
            component_has_keyed_transform: self.component_has_keyed_transform,
            root_component_has_keyed_transform: self.root_component_has_keyed_transform,
        })
    }
}
