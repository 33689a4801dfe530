//! Named scalar curves carried by a keyframe.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use posemix_api_core::blend::lerp_f;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CurveSet {
    values: HashMap<String, f32>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f32) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f32)> {
        self.values.iter()
    }

    /// Interpolate each curve present on either side; a missing curve reads as 0.
    pub fn blend(a: &CurveSet, b: &CurveSet, t: f32) -> CurveSet {
        Self::blend_with(a, b, |_| t)
    }

    /// Interpolate with a per-curve alpha.
    pub fn blend_with(a: &CurveSet, b: &CurveSet, alpha: impl Fn(&str) -> f32) -> CurveSet {
        let mut out = a.clone();
        for (name, value) in out.values.iter_mut() {
            let other = b.values.get(name).copied().unwrap_or(0.0);
            *value = lerp_f(*value, other, alpha(name));
        }
        for (name, &value) in b.values.iter() {
            if !a.values.contains_key(name) {
                out.values.insert(name.clone(), lerp_f(0.0, value, alpha(name)));
            }
        }
        out
    }

    pub fn scale_by(&mut self, w: f32) {
        for value in self.values.values_mut() {
            *value *= w;
        }
    }

    /// `self += other * w`, inserting curves `self` does not have yet.
    pub fn accumulate(&mut self, other: &CurveSet, w: f32) {
        for (name, &value) in other.values.iter() {
            *self.values.entry(name.clone()).or_insert(0.0) += value * w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_treats_missing_as_zero() {
        let mut a = CurveSet::new();
        a.set("Jaw", 1.0);
        let mut b = CurveSet::new();
        b.set("Blink", 1.0);
        let r = CurveSet::blend(&a, &b, 0.25);
        assert_eq!(r.get("Jaw"), Some(0.75));
        assert_eq!(r.get("Blink"), Some(0.25));
    }

    #[test]
    fn accumulate_inserts_and_adds() {
        let mut a = CurveSet::new();
        a.set("Jaw", 1.0);
        let mut b = CurveSet::new();
        b.set("Jaw", 2.0);
        b.set("Blink", 4.0);
        a.accumulate(&b, 0.5);
        assert_eq!(a.get("Jaw"), Some(2.0));
        assert_eq!(a.get("Blink"), Some(2.0));
    }
}
