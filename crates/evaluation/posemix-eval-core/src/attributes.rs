//! Typed attributes carried by a keyframe, keyed by (name, bone index, namespace).

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use posemix_api_core::{AttributeId, AttributeValue, Transform};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AttributeSet {
    #[serde(with = "posemix_api_core::serde_pairs")]
    values: HashMap<AttributeId, AttributeValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: AttributeId, value: AttributeValue) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: &AttributeId) -> Option<&AttributeValue> {
        self.values.get(id)
    }

    pub fn remove(&mut self, id: &AttributeId) -> Option<AttributeValue> {
        self.values.remove(id)
    }

    pub fn contains(&self, id: &AttributeId) -> bool {
        self.values.contains_key(id)
    }

    pub fn get_transform(&self, id: &AttributeId) -> Option<Transform> {
        self.values.get(id).and_then(|v| v.as_transform().copied())
    }

    pub fn get_int(&self, id: &AttributeId) -> Option<i32> {
        self.values.get(id).and_then(AttributeValue::as_int)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeId, &AttributeValue)> {
        self.values.iter()
    }

    /// Interpolate every attribute present on either side. A side without the
    /// attribute contributes the neutral value of the other side's kind.
    pub fn blend(a: &AttributeSet, b: &AttributeSet, t: f32) -> AttributeSet {
        Self::blend_with(a, b, |_| t)
    }

    /// Interpolate with a per-attribute alpha.
    pub fn blend_with(
        a: &AttributeSet,
        b: &AttributeSet,
        alpha: impl Fn(&AttributeId) -> f32,
    ) -> AttributeSet {
        let mut out = AttributeSet::new();
        for (id, va) in a.values.iter() {
            let t = alpha(id);
            let value = match b.values.get(id) {
                Some(vb) => AttributeValue::blend(va, vb, t),
                None => AttributeValue::blend(va, &AttributeValue::identity(va.kind()), t),
            };
            out.values.insert(id.clone(), value);
        }
        for (id, vb) in b.values.iter() {
            if !a.values.contains_key(id) {
                let t = alpha(id);
                let value = AttributeValue::blend(&AttributeValue::identity(vb.kind()), vb, t);
                out.values.insert(id.clone(), value);
            }
        }
        out
    }

    pub fn scale_by(&mut self, w: f32) {
        for value in self.values.values_mut() {
            value.scale_by(w);
        }
    }

    /// `self += other * w`. Attributes missing from `self` are inserted scaled.
    pub fn accumulate(&mut self, other: &AttributeSet, w: f32) {
        for (id, value) in other.values.iter() {
            match self.values.get_mut(id) {
                Some(existing) => existing.accumulate(value, w),
                None => {
                    let mut scaled = value.clone();
                    scaled.scale_by(w);
                    self.values.insert(id.clone(), scaled);
                }
            }
        }
    }

    /// Layer additive attributes on top: transforms compose, floats add, integers
    /// are taken from the additive side only when missing here.
    pub fn apply_additive(&mut self, additive: &AttributeSet, w: f32) {
        for (id, value) in additive.values.iter() {
            let Some(existing) = self.values.get_mut(id) else {
                self.values.insert(id.clone(), value.clone());
                continue;
            };
            match (existing, value) {
                (AttributeValue::Transform(base), AttributeValue::Transform(delta)) => {
                    base.apply_additive(delta, w)
                }
                (AttributeValue::Float(base), AttributeValue::Float(delta)) => *base += delta * w,
                _ => {}
            }
        }
    }

    pub fn normalize(&mut self) {
        for value in self.values.values_mut() {
            value.normalize();
        }
    }
}
