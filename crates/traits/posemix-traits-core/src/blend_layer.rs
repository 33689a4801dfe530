//! Per-bone masked blend of a layer pose over a base pose.
//!
//! Mask weights come from a weight table (bone, curve and attribute entries) and
//! are built lazily against the skeleton the layer is updated with.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use posemix_api_core::attribute::INDEX_NONE;
use posemix_api_core::tolerance::is_relevant_weight;
use posemix_eval_core::{
    AttributeId, BlendPerBoneTask, EvaluationProgram, PerBoneBlendWeights, ReferenceSkeleton, Task,
};

use crate::error::TraitError;
use crate::node::{PoseNode, UpdateContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightEntryKind {
    Bone,
    Curve,
    Attribute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightTableEntry {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub kind: WeightEntryKind,
    pub value: f32,
}

/// Hierarchical mask: each entry names a bone, curve or attribute and its weight.
/// Attribute entries hang off the bone that owns them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<WeightTableEntry>,
}

impl WeightTable {
    /// Parse and validate.
    pub fn from_json(text: &str) -> Result<Self, TraitError> {
        let table: WeightTable = serde_json::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    pub fn entry(&self, name: &str) -> Option<&WeightTableEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn validate(&self) -> Result<(), TraitError> {
        for entry in &self.entries {
            let parent = match &entry.parent {
                Some(parent) => Some(self.entry(parent).ok_or_else(|| {
                    TraitError::UnknownParent {
                        table: self.name.clone(),
                        entry: entry.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
            if entry.kind == WeightEntryKind::Attribute
                && parent.map(|p| p.kind) != Some(WeightEntryKind::Bone)
            {
                return Err(TraitError::AttributeWithoutBoneParent {
                    table: self.name.clone(),
                    entry: entry.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build index-aligned bone weights plus sparse curve and attribute weights.
    /// Bones the skeleton lacks are ignored; bones the table lacks get 0.
    ///
    /// Panics if an attribute entry lacks a bone parent; `validate` reports the
    /// same condition as an error at load time.
    pub fn build_weights(&self, skeleton: &ReferenceSkeleton) -> PerBoneBlendWeights {
        let mut weights = PerBoneBlendWeights::uniform(skeleton.bone_count(), 0.0);
        for entry in &self.entries {
            match entry.kind {
                WeightEntryKind::Bone => match skeleton.find_bone(&entry.name) {
                    Some(bone) => weights.bone_weights[bone] = entry.value,
                    None => log::debug!(
                        "weight table '{}': bone '{}' not in skeleton '{}'",
                        self.name,
                        entry.name,
                        skeleton.name
                    ),
                },
                WeightEntryKind::Curve => {
                    weights.curve_weights.insert(entry.name.clone(), entry.value);
                }
                WeightEntryKind::Attribute => {
                    let parent = entry.parent.as_deref().and_then(|p| self.entry(p));
                    assert!(
                        matches!(parent, Some(p) if p.kind == WeightEntryKind::Bone),
                        "weight table '{}': attribute '{}' must have a bone parent",
                        self.name,
                        entry.name
                    );
                    let bone_index = parent
                        .and_then(|p| skeleton.find_bone(&p.name))
                        .map_or(INDEX_NONE, |b| b as i32);
                    weights
                        .attribute_weights
                        .insert(AttributeId::bone(entry.name.clone(), bone_index), entry.value);
                }
            }
        }
        weights
    }
}

/// Blends `layer` over `base` through a weight table. Without a table the layer
/// contributes nothing.
pub struct BlendLayer {
    base: Box<dyn PoseNode>,
    layer: Box<dyn PoseNode>,
    table: Option<Arc<WeightTable>>,
    weights: Option<Arc<PerBoneBlendWeights>>,
    weights_dirty: bool,
    weight: f32,
    blend_weight: f32,
    layer_active: bool,
    warned_missing_table: bool,
}

impl BlendLayer {
    pub fn new(base: Box<dyn PoseNode>, layer: Box<dyn PoseNode>) -> Self {
        Self {
            base,
            layer,
            table: None,
            weights: None,
            weights_dirty: true,
            weight: 1.0,
            blend_weight: 0.0,
            layer_active: false,
            warned_missing_table: false,
        }
    }

    pub fn with_weight_table(mut self, table: Arc<WeightTable>) -> Self {
        self.set_weight_table(Some(table));
        self
    }

    pub fn set_weight_table(&mut self, table: Option<Arc<WeightTable>>) {
        self.table = table;
        self.warned_missing_table = false;
        self.mark_weights_dirty();
    }

    /// Force a rebuild of the mask weights on the next update.
    pub fn mark_weights_dirty(&mut self) {
        self.weights_dirty = true;
    }

    /// User weight; clamped to 0..=1 on update.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    pub fn blend_weight(&self) -> f32 {
        self.blend_weight
    }

    pub fn is_layer_active(&self) -> bool {
        self.layer_active
    }

    pub fn weights(&self) -> Option<&Arc<PerBoneBlendWeights>> {
        self.weights.as_ref()
    }

    fn refresh_weights(&mut self, skeleton: &ReferenceSkeleton) {
        let Some(table) = &self.table else {
            self.weights = None;
            self.weights_dirty = false;
            return;
        };
        let stale = self
            .weights
            .as_ref()
            .map_or(true, |w| w.bone_weights.len() != skeleton.bone_count());
        if self.weights_dirty || stale {
            log::debug!(
                "blend layer: building weights from '{}' for skeleton '{}'",
                table.name,
                skeleton.name
            );
            self.weights = Some(Arc::new(table.build_weights(skeleton)));
            self.weights_dirty = false;
        }
    }
}

impl PoseNode for BlendLayer {
    fn update(&mut self, ctx: &UpdateContext<'_>) {
        self.refresh_weights(ctx.skeleton);
        self.blend_weight = if self.table.is_some() {
            self.weight.clamp(0.0, 1.0)
        } else {
            if !self.warned_missing_table {
                log::warn!("blend layer has no weight table; using the base pose only");
                self.warned_missing_table = true;
            }
            0.0
        };

        self.base.update(ctx);
        let was_active = self.layer_active;
        self.layer_active = self.weights.is_some() && is_relevant_weight(self.blend_weight);
        if self.layer_active {
            self.layer
                .update(&ctx.with_newly_relevant(ctx.newly_relevant || !was_active));
        }
    }

    fn evaluate(&self, program: &mut EvaluationProgram) {
        self.base.evaluate(program);
        let Some(weights) = self.weights.as_ref().filter(|_| self.layer_active) else {
            return;
        };
        self.layer.evaluate(program);
        program.append_task(Task::BlendPerBone(BlendPerBoneTask {
            weights: weights.clone(),
            blend_weight: self.blend_weight,
        }));
        program.append_task(Task::NormalizeRotations);
    }
}
