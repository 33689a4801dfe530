//! Animation clips: per-bone transform tracks and scalar curve tracks.
//!
//! Model:
//! - Keys carry absolute times in seconds within `[0, duration]`, sorted ascending.
//! - Sampling is linear between keys (spherical for rotation) and holds the end keys outside them.
//! - Bones without a track keep whatever the target keyframe already holds (the reference pose
//!   when sampled through a task).

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::keyframe::Keyframe;
use crate::skeleton::ReferenceSkeleton;
use posemix_api_core::blend::lerp_f;
use posemix_api_core::{AttributeId, AttributeValue, Transform};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransformKey {
    pub time: f32,
    pub transform: Transform,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoneTrack {
    pub bone: usize,
    pub keys: Vec<TransformKey>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurveTrack {
    pub name: String,
    pub keys: Vec<CurveKey>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
    #[serde(default)]
    pub additive: bool,
    /// Emit the root bone's movement between samples as a root motion delta attribute.
    #[serde(default)]
    pub root_motion: bool,
    #[serde(default)]
    pub bone_tracks: Vec<BoneTrack>,
    #[serde(default)]
    pub curve_tracks: Vec<CurveTrack>,
}

/// Index of the last key at or before `time`, and the alpha toward the next key.
fn find_segment(times: impl ExactSizeIterator<Item = f32> + Clone, time: f32) -> (usize, usize, f32) {
    let n = times.len();
    if n <= 1 {
        return (0, 0, 0.0);
    }
    let after = times.clone().position(|t| t > time).unwrap_or(n);
    if after == 0 {
        return (0, 0, 0.0);
    }
    if after == n {
        return (n - 1, n - 1, 0.0);
    }
    let mut it = times.skip(after - 1);
    let t0 = it.next().unwrap_or(time);
    let t1 = it.next().unwrap_or(time);
    let denom = (t1 - t0).max(f32::EPSILON);
    (after - 1, after, ((time - t0) / denom).clamp(0.0, 1.0))
}

fn sample_transform(keys: &[TransformKey], time: f32) -> Option<Transform> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, alpha) = find_segment(keys.iter().map(|k| k.time), time);
    if i0 == i1 {
        return Some(keys[i0].transform);
    }
    Some(Transform::blend(&keys[i0].transform, &keys[i1].transform, alpha))
}

fn sample_curve(keys: &[CurveKey], time: f32) -> Option<f32> {
    if keys.is_empty() {
        return None;
    }
    let (i0, i1, alpha) = find_segment(keys.iter().map(|k| k.time), time);
    Some(lerp_f(keys[i0].value, keys[i1].value, alpha))
}

impl AnimationClip {
    pub fn from_json(text: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check that every track targets a bone of `skeleton` and keys are sorted.
    pub fn validate(&self, skeleton: &ReferenceSkeleton) -> Result<(), EvalError> {
        for track in &self.bone_tracks {
            if track.bone >= skeleton.bone_count() {
                return Err(EvalError::ClipBoneOutOfRange {
                    clip: self.name.clone(),
                    bone: track.bone,
                    bone_count: skeleton.bone_count(),
                });
            }
            if track.keys.windows(2).any(|w| w[1].time < w[0].time) {
                return Err(EvalError::UnsortedKeys {
                    clip: self.name.clone(),
                    track: format!("bone {}", track.bone),
                });
            }
        }
        for track in &self.curve_tracks {
            if track.keys.windows(2).any(|w| w[1].time < w[0].time) {
                return Err(EvalError::UnsortedKeys {
                    clip: self.name.clone(),
                    track: track.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Map a playback time into clip time: wrapped when looping, clamped otherwise.
    pub fn local_time(&self, time: f32, looping: bool) -> f32 {
        if !(self.duration > 0.0) {
            return 0.0;
        }
        if looping {
            time.rem_euclid(self.duration)
        } else {
            time.clamp(0.0, self.duration)
        }
    }

    fn root_transform_at(&self, time: f32) -> Option<Transform> {
        self.bone_tracks
            .iter()
            .find(|t| t.bone == 0)
            .and_then(|t| sample_transform(&t.keys, time))
    }

    /// Root movement from `previous` to `current` (both playback times), in the
    /// space of the root at `previous`. Handles a single wrap when looping.
    pub fn root_motion_delta(&self, previous: f32, current: f32, looping: bool) -> Option<Transform> {
        let p = self.local_time(previous, looping);
        let c = self.local_time(current, looping);
        let at_p = self.root_transform_at(p)?;
        let at_c = self.root_transform_at(c)?;
        if looping && current > previous && c < p {
            let at_end = self.root_transform_at(self.duration)?;
            let at_start = self.root_transform_at(0.0)?;
            let first = at_end.relative_to(&at_p);
            let second = at_c.relative_to(&at_start);
            return Some(second.mul(&first));
        }
        Some(at_c.relative_to(&at_p))
    }

    /// Overwrite the animated bones and curves of `keyframe` with this clip at `time`.
    /// Tracks for bones beyond the keyframe's bone count (LOD) are skipped.
    pub fn sample_into(&self, keyframe: &mut Keyframe, time: f32, looping: bool) {
        let t = self.local_time(time, looping);
        let bone_count = keyframe.bone_count();
        for track in &self.bone_tracks {
            if track.bone >= bone_count {
                continue;
            }
            if let Some(transform) = sample_transform(&track.keys, t) {
                keyframe.pose.transforms[track.bone] = transform;
            }
        }
        for track in &self.curve_tracks {
            if let Some(value) = sample_curve(&track.keys, t) {
                keyframe.curves.set(track.name.clone(), value);
            }
        }
    }

    /// Sample and, for root-motion clips with a previous time, attach the root delta.
    pub fn sample_with_root_motion(
        &self,
        keyframe: &mut Keyframe,
        time: f32,
        previous_time: Option<f32>,
        looping: bool,
    ) {
        self.sample_into(keyframe, time, looping);
        if !self.root_motion {
            return;
        }
        if let Some(delta) = previous_time.and_then(|p| self.root_motion_delta(p, time, looping)) {
            keyframe
                .attributes
                .set(AttributeId::root_motion_delta(), AttributeValue::Transform(delta));
        }
    }
}
