//! Mixer system: owns every entry and one mixer per (object, target).
//!
//! Methods:
//! - link_entry / unlink_entry, set_weight / set_priority / set_task / set_root_motion
//! - evaluate (resolve dirty mixers, refresh root motion, emit one task per mixer)
//! - apply_root_motion (write pending root motion to the host scene)

use std::sync::Arc;

use indexmap::IndexMap;
use posemix_eval_core::{
    is_interactive_move_in_progress, EvaluationProgram, RootMotionDestination, RootMotionWrite,
    Task,
};

use crate::arena::EntryArena;
use crate::config::MixerConfig;
use crate::entry::{MixerEntry, RootMotionSettings};
use crate::error::MixerError;
use crate::host::SceneHost;
use crate::ids::{EntryHandle, MixerKey};
use crate::mixer::{Mixer, MixerChange};
use crate::resolve::resolve;

#[derive(Debug)]
struct LinkedEntry {
    key: MixerKey,
    entry: MixerEntry,
}

#[derive(Debug, Default)]
pub struct MixerSystem {
    cfg: MixerConfig,
    entries: EntryArena<LinkedEntry>,
    mixers: IndexMap<MixerKey, Mixer>,
}

impl MixerSystem {
    pub fn new(cfg: MixerConfig) -> Self {
        Self {
            cfg,
            entries: EntryArena::new(),
            mixers: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.cfg
    }

    /// Start contributing `entry` to the mixer for `key`, creating the mixer if needed.
    pub fn link_entry(&mut self, key: MixerKey, entry: MixerEntry) -> (EntryHandle, MixerChange) {
        let wants_root_motion = entry.root_motion.is_some();
        let handle = self.entries.insert(LinkedEntry {
            key: key.clone(),
            entry,
        });
        let mixer = self.mixers.entry(key).or_default();
        mixer.entries.push(handle);
        if wants_root_motion {
            mixer.ensure_root_motion();
        }
        (handle, mixer.mark_dirty())
    }

    /// Stop contributing; tears the mixer down when this was its last entry.
    pub fn unlink_entry(&mut self, handle: EntryHandle) -> Result<MixerChange, MixerError> {
        let linked = self
            .entries
            .remove(handle)
            .ok_or(MixerError::StaleHandle(handle))?;
        let Some(mixer) = self.mixers.get_mut(&linked.key) else {
            return Ok(MixerChange::Unchanged);
        };
        let arena = &self.entries;
        mixer.entries.retain(|h| arena.contains(*h));
        if mixer.entries.is_empty() {
            self.mixers.shift_remove(&linked.key);
            log::debug!("mixer {} torn down", linked.key);
            return Ok(MixerChange::TornDown);
        }
        Ok(mixer.mark_dirty())
    }

    pub fn entry(&self, handle: EntryHandle) -> Option<&MixerEntry> {
        self.entries.get(handle).map(|linked| &linked.entry)
    }

    fn update_entry(
        &mut self,
        handle: EntryHandle,
        update: impl FnOnce(&mut MixerEntry) -> bool,
    ) -> Result<MixerChange, MixerError> {
        let linked = self
            .entries
            .get_mut(handle)
            .ok_or(MixerError::StaleHandle(handle))?;
        if !update(&mut linked.entry) {
            return Ok(MixerChange::Unchanged);
        }
        let wants_root_motion = linked.entry.root_motion.is_some();
        let Some(mixer) = self.mixers.get_mut(&linked.key) else {
            return Ok(MixerChange::Unchanged);
        };
        if wants_root_motion {
            mixer.ensure_root_motion();
        }
        Ok(mixer.mark_dirty())
    }

    pub fn set_weight(&mut self, handle: EntryHandle, weight: f32) -> Result<MixerChange, MixerError> {
        if !weight.is_finite() {
            return Err(MixerError::InvalidWeight { weight });
        }
        self.update_entry(handle, |entry| {
            if entry.weight == weight {
                return false;
            }
            entry.weight = weight;
            true
        })
    }

    pub fn set_priority(&mut self, handle: EntryHandle, priority: i32) -> Result<MixerChange, MixerError> {
        self.update_entry(handle, |entry| {
            if entry.priority == priority {
                return false;
            }
            entry.priority = priority;
            true
        })
    }

    /// Replace the producing task; `None` keeps the entry linked but out of the program.
    pub fn set_task(&mut self, handle: EntryHandle, task: Option<Task>) -> Result<MixerChange, MixerError> {
        self.update_entry(handle, |entry| {
            entry.task = task.map(Arc::new);
            true
        })
    }

    pub fn set_root_motion(
        &mut self,
        handle: EntryHandle,
        settings: Option<RootMotionSettings>,
    ) -> Result<MixerChange, MixerError> {
        self.update_entry(handle, |entry| {
            if entry.root_motion == settings {
                return false;
            }
            entry.root_motion = settings;
            true
        })
    }

    /// Destination is read when the program runs, so no re-resolution is needed.
    pub fn set_root_motion_destination(&mut self, key: &MixerKey, destination: RootMotionDestination) {
        if let Some(mixer) = self.mixers.get_mut(key) {
            mixer.destination = destination;
            if let Some(data) = &mixer.root_motion {
                data.set_destination(destination);
            }
        }
    }

    /// Whether the component (or the actor's root component) has a keyed world transform.
    pub fn set_keyed_transforms(
        &mut self,
        key: &MixerKey,
        component: bool,
        root_component: bool,
    ) -> MixerChange {
        let Some(mixer) = self.mixers.get_mut(key) else {
            return MixerChange::Unchanged;
        };
        if mixer.component_has_keyed_transform == component
            && mixer.root_component_has_keyed_transform == root_component
        {
            return MixerChange::Unchanged;
        }
        mixer.component_has_keyed_transform = component;
        mixer.root_component_has_keyed_transform = root_component;
        mixer.mark_dirty()
    }

    pub fn mixer(&self, key: &MixerKey) -> Option<&Mixer> {
        self.mixers.get(key)
    }

    pub fn mixers(&self) -> impl Iterator<Item = (&MixerKey, &Mixer)> {
        self.mixers.iter()
    }

    pub fn mixer_count(&self) -> usize {
        self.mixers.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Last resolved program for `key`, shareable with other consumers.
    pub fn program(&self, key: &MixerKey) -> Option<Arc<EvaluationProgram>> {
        self.mixers.get(key).and_then(|m| m.program.clone())
    }

    fn resolve_mixer(
        cfg: &MixerConfig,
        arena: &EntryArena<LinkedEntry>,
        key: &MixerKey,
        mixer: &mut Mixer,
    ) {
        mixer.entries.retain(|h| arena.contains(*h));
        let live: Vec<&MixerEntry> = mixer
            .entries
            .iter()
            .filter_map(|h| arena.get(*h))
            .map(|linked| &linked.entry)
            .collect();
        if !live.iter().any(|e| e.root_motion.is_some()) && mixer.root_motion.take().is_some() {
            log::debug!("mixer {key} released its root motion data");
        }
        let plan = mixer.root_motion_plan();
        mixer.program = Some(resolve(&live, plan.as_ref(), cfg).freeze());
        mixer.dirty = false;
    }

    /// Resolve every dirty mixer, refresh root motion data, and return one
    /// `ExecuteProgram` task per mixer in link order.
    pub fn evaluate<H: SceneHost + ?Sized>(&mut self, host: &H) -> Vec<(MixerKey, Task)> {
        let mut tasks = Vec::with_capacity(self.mixers.len());
        for (key, mixer) in self.mixers.iter_mut() {
            if mixer.dirty || mixer.program.is_none() || !self.cfg.cache_programs {
                Self::resolve_mixer(&self.cfg, &self.entries, key, mixer);
            }
            if let Some(data) = &mixer.root_motion {
                data.initialize(host.component_transforms(key.object));
            }
            if let Some(program) = &mixer.program {
                tasks.push((key.clone(), Task::ExecuteProgram(program.clone())));
            }
        }
        tasks
    }

    /// Apply root motion written by the last executed programs. Returns the number
    /// of transforms written; none while an interactive move is in progress.
    pub fn apply_root_motion<H: SceneHost + ?Sized>(&self, host: &mut H) -> usize {
        let suppressed = is_interactive_move_in_progress();
        let mut applied = 0;
        for (key, mixer) in &self.mixers {
            let Some(write) = mixer.root_motion.as_ref().and_then(|d| d.take_pending_write()) else {
                continue;
            };
            if suppressed {
                log::debug!("interactive move in progress; dropping root motion for {key}");
                continue;
            }
            match write {
                RootMotionWrite::Component(t) => host.set_component_world_transform(key.object, t),
                RootMotionWrite::Actor(t) => host.set_actor_world_transform(key.object, t),
            }
            applied += 1;
        }
        applied
    }
}
