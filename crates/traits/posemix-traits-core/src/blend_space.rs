//! 2D blend spaces: clip samples placed on a plane and an authored triangulation.
//!
//! Sampling weights:
//! - inside a triangle: barycentric coordinates of the point
//! - outside every triangle: the point is projected onto the closest triangle
//!   edge and the two edge samples share the weight
//! - weights at or below `ZERO_ANIM_WEIGHT_THRESH` are dropped and the rest
//!   renormalized

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use posemix_api_core::tolerance::{SMALL_NUMBER, ZERO_ANIM_WEIGHT_THRESH};
use posemix_eval_core::{AnimationClip, EvaluationProgram, Task};

use crate::error::TraitError;
use crate::node::{ClipPlayerNode, PoseNode, UpdateContext};

pub type Vec2 = [f32; 2];

/// Clips by name, used to bind blend-space samples.
pub type ClipLibrary = HashMap<String, Arc<AnimationClip>>;

/// Barycentric tolerance so points on a shared edge land in a triangle.
const INSIDE_TOLERANCE: f32 = 1.0e-5;

fn default_play_rate() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendSample {
    pub position: Vec2,
    pub clip: String,
    #[serde(default = "default_play_rate")]
    pub play_rate: f32,
}

/// Speed-limited input filter for one axis, in units per second. `0` disables it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSmoothing {
    pub speed: f32,
}

impl AxisSmoothing {
    pub fn step(&self, current: f32, target: f32, delta_time: f32) -> f32 {
        if !(self.speed > 0.0) {
            return target;
        }
        let max_step = self.speed * delta_time.max(0.0);
        current + (target - current).max(-max_step).min(max_step)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleWeight {
    pub sample: usize,
    pub weight: f32,
}

#[inline]
fn sub(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
fn dot(a: Vec2, b: Vec2) -> f32 {
    a[0] * b[0] + a[1] * b[1]
}

/// Barycentric coordinates of `v` in triangle `(p, q, r)`, or `None` when degenerate.
fn barycentric(p: Vec2, q: Vec2, r: Vec2, v: Vec2) -> Option<[f32; 3]> {
    let v0 = sub(q, p);
    let v1 = sub(r, p);
    let v2 = sub(v, p);
    let d00 = dot(v0, v0);
    let d01 = dot(v0, v1);
    let d11 = dot(v1, v1);
    let d20 = dot(v2, v0);
    let d21 = dot(v2, v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= SMALL_NUMBER {
        return None;
    }
    let y = (d11 * d20 - d01 * d21) / denom;
    let z = (d00 * d21 - d01 * d20) / denom;
    Some([1.0 - y - z, y, z])
}

/// Parameter along `p -> q` of the closest point to `v`, clamped to the segment.
fn closest_on_segment(p: Vec2, q: Vec2, v: Vec2) -> f32 {
    let pq = sub(q, p);
    let len2 = dot(pq, pq);
    if len2 <= SMALL_NUMBER {
        return 0.0;
    }
    (dot(sub(v, p), pq) / len2).clamp(0.0, 1.0)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendSpace {
    pub name: String,
    #[serde(default)]
    pub samples: Vec<BlendSample>,
    /// Sample index triples.
    #[serde(default)]
    pub triangles: Vec<[usize; 3]>,
    #[serde(default)]
    pub smoothing: [AxisSmoothing; 2],
}

impl BlendSpace {
    /// Parse and validate.
    pub fn from_json(text: &str) -> Result<Self, TraitError> {
        let space: BlendSpace = serde_json::from_str(text)?;
        space.validate()?;
        Ok(space)
    }

    pub fn validate(&self) -> Result<(), TraitError> {
        if self.samples.len() > 2 && self.triangles.is_empty() {
            return Err(TraitError::MissingTriangulation {
                space: self.name.clone(),
                samples: self.samples.len(),
            });
        }
        for (index, tri) in self.triangles.iter().enumerate() {
            let invalid = |reason| TraitError::InvalidTriangle {
                space: self.name.clone(),
                triangle: index,
                reason,
            };
            if tri.iter().any(|&s| s >= self.samples.len()) {
                return Err(invalid("references a missing sample"));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(invalid("repeats a sample"));
            }
            let [p, q, r] = tri.map(|s| self.samples[s].position);
            if barycentric(p, q, r, p).is_none() {
                return Err(invalid("is degenerate"));
            }
        }
        Ok(())
    }

    fn edge_weights(&self, a: usize, b: usize, point: Vec2) -> (f32, [SampleWeight; 2]) {
        let (p, q) = (self.samples[a].position, self.samples[b].position);
        let t = closest_on_segment(p, q, point);
        let closest = [p[0] + (q[0] - p[0]) * t, p[1] + (q[1] - p[1]) * t];
        let offset = sub(point, closest);
        (
            dot(offset, offset),
            [
                SampleWeight {
                    sample: a,
                    weight: 1.0 - t,
                },
                SampleWeight {
                    sample: b,
                    weight: t,
                },
            ],
        )
    }

    fn raw_weights(&self, point: Vec2) -> Vec<SampleWeight> {
        match self.samples.len() {
            0 => return Vec::new(),
            1 => {
                return vec![SampleWeight {
                    sample: 0,
                    weight: 1.0,
                }]
            }
            2 if self.triangles.is_empty() => return self.edge_weights(0, 1, point).1.to_vec(),
            _ => {}
        }

        for tri in &self.triangles {
            let [p, q, r] = tri.map(|s| self.samples[s].position);
            let Some(bary) = barycentric(p, q, r, point) else {
                continue;
            };
            if bary.iter().all(|&w| w >= -INSIDE_TOLERANCE) {
                return tri
                    .iter()
                    .zip(bary)
                    .map(|(&sample, weight)| SampleWeight {
                        sample,
                        weight: weight.max(0.0),
                    })
                    .collect();
            }
        }

        let mut best: Option<(f32, [SampleWeight; 2])> = None;
        for tri in &self.triangles {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let candidate = self.edge_weights(a, b, point);
                if best.as_ref().map_or(true, |(d, _)| candidate.0 < *d) {
                    best = Some(candidate);
                }
            }
        }
        best.map(|(_, weights)| weights.to_vec()).unwrap_or_default()
    }

    /// Sparse weights for `point`, sorted by sample index and summing to 1.
    pub fn sample_weights(&self, point: Vec2) -> Vec<SampleWeight> {
        let mut weights = self.raw_weights(point);
        weights.retain(|w| w.weight > ZERO_ANIM_WEIGHT_THRESH);
        weights.sort_by_key(|w| w.sample);
        weights.dedup_by(|next, kept| {
            if next.sample == kept.sample {
                kept.weight += next.weight;
                true
            } else {
                false
            }
        });
        let total: f32 = weights.iter().map(|w| w.weight).sum();
        if total > SMALL_NUMBER {
            for w in &mut weights {
                w.weight /= total;
            }
        }
        weights
    }
}

/// Plays a blend space: one lazily created clip player per sample, weighted by
/// the sampled position of the (smoothed) input.
pub struct BlendSpacePlayer {
    space: Option<Arc<BlendSpace>>,
    clips: Vec<Arc<AnimationClip>>,
    players: Vec<Option<ClipPlayerNode>>,
    input: Vec2,
    filtered: Option<Vec2>,
    play_rate: f32,
    looping: bool,
    active: Vec<SampleWeight>,
    newly_relevant: Vec<usize>,
    warned_missing_space: bool,
}

impl BlendSpacePlayer {
    /// Validate `space` and bind every sample to its clip in `library`.
    pub fn new(space: Arc<BlendSpace>, library: &ClipLibrary) -> Result<Self, TraitError> {
        space.validate()?;
        let clips = space
            .samples
            .iter()
            .enumerate()
            .map(|(sample, s)| {
                library
                    .get(&s.clip)
                    .cloned()
                    .ok_or_else(|| TraitError::MissingClip {
                        space: space.name.clone(),
                        sample,
                        clip: s.clip.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut player = Self::without_space();
        player.players = vec![None; clips.len()];
        player.clips = clips;
        player.space = Some(space);
        Ok(player)
    }

    /// A player with no blend space; it never emits tasks.
    pub fn without_space() -> Self {
        Self {
            space: None,
            clips: Vec::new(),
            players: Vec::new(),
            input: [0.0, 0.0],
            filtered: None,
            play_rate: 1.0,
            looping: true,
            active: Vec::new(),
            newly_relevant: Vec::new(),
            warned_missing_space: false,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn space(&self) -> Option<&Arc<BlendSpace>> {
        self.space.as_ref()
    }

    pub fn set_input(&mut self, input: Vec2) {
        self.input = input;
    }

    /// Input after smoothing, as used by the last update.
    pub fn filtered_input(&self) -> Option<Vec2> {
        self.filtered
    }

    /// Global multiplier on every sample's play rate.
    pub fn set_play_rate(&mut self, play_rate: f32) {
        self.play_rate = play_rate;
    }

    pub fn active_samples(&self) -> &[SampleWeight] {
        &self.active
    }

    /// Sample entered the active set (or first produced output) in the last update.
    pub fn is_newly_relevant(&self, sample: usize) -> bool {
        self.newly_relevant.contains(&sample)
    }

    pub fn sample_player(&self, sample: usize) -> Option<&ClipPlayerNode> {
        self.players.get(sample).and_then(Option::as_ref)
    }
}

impl PoseNode for BlendSpacePlayer {
    fn update(&mut self, ctx: &UpdateContext<'_>) {
        let Some(space) = self.space.clone() else {
            if !self.warned_missing_space {
                log::warn!("blend space player has no blend space; emitting no pose");
                self.warned_missing_space = true;
            }
            self.active.clear();
            return;
        };

        let input = self.input;
        let filtered = match self.filtered {
            Some(prev) if !ctx.newly_relevant => [
                space.smoothing[0].step(prev[0], input[0], ctx.delta_time),
                space.smoothing[1].step(prev[1], input[1], ctx.delta_time),
            ],
            _ => input,
        };
        self.filtered = Some(filtered);

        let weights = space.sample_weights(filtered);
        self.newly_relevant.clear();
        for w in &weights {
            let was_active = self.active.iter().any(|a| a.sample == w.sample);
            let slot = &mut self.players[w.sample];
            let newly_relevant = ctx.newly_relevant || !was_active || slot.is_none();
            if newly_relevant {
                self.newly_relevant.push(w.sample);
            }
            let sample = &space.samples[w.sample];
            let clip = &self.clips[w.sample];
            let looping = self.looping;
            let player = slot.get_or_insert_with(|| {
                log::debug!("blend space '{}': instantiating sample {}", space.name, w.sample);
                ClipPlayerNode::new(clip.clone())
                    .with_play_rate(sample.play_rate)
                    .with_looping(looping)
            });
            player.update(
                &ctx.with_delta_time(ctx.delta_time * self.play_rate)
                    .with_newly_relevant(newly_relevant),
            );
        }
        self.active = weights;
    }

    fn evaluate(&self, program: &mut EvaluationProgram) {
        let active: Vec<(&ClipPlayerNode, f32)> = self
            .active
            .iter()
            .filter_map(|w| self.sample_player(w.sample).map(|p| (p, w.weight)))
            .collect();
        for (player, _) in &active {
            player.evaluate(program);
        }
        match active.as_slice() {
            [] | [_] => {}
            [_, (_, second)] => program.append_task(Task::blend_two(*second)),
            [earlier @ .., (_, last)] => {
                program.append_task(Task::OverwriteWithScale { scale: *last });
                for (_, weight) in earlier.iter().rev() {
                    program.append_task(Task::AddWithScale { scale: *weight });
                }
                program.append_task(Task::NormalizeRotations);
            }
        }
    }
}
