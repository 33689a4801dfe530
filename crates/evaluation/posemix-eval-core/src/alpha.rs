//! Scale/bias/clamp mapping applied to curve-driven blend alphas.

use serde::{Deserialize, Serialize};

use posemix_api_core::blend::lerp_f;
use posemix_api_core::tolerance::is_nearly_zero;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

/// `value -> remap(in_range, out_range) -> value * scale + bias -> clamp(min, max)`.
/// Remap and clamp are optional.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaleBiasClamp {
    pub map_range: Option<(FloatRange, FloatRange)>,
    pub scale: f32,
    pub bias: f32,
    pub clamp: Option<FloatRange>,
}

impl Default for ScaleBiasClamp {
    fn default() -> Self {
        Self {
            map_range: None,
            scale: 1.0,
            bias: 0.0,
            clamp: None,
        }
    }
}

impl ScaleBiasClamp {
    pub fn apply(&self, value: f32) -> f32 {
        let mut result = value;
        if let Some((input, output)) = &self.map_range {
            let span = input.max - input.min;
            let t = if is_nearly_zero(span) {
                0.0
            } else {
                ((result - input.min) / span).clamp(0.0, 1.0)
            };
            result = lerp_f(output.min, output.max, t);
        }
        result = result * self.scale + self.bias;
        // Inverted or NaN bounds resolve to `max` instead of panicking.
        if let Some(range) = &self.clamp {
            result = result.max(range.min).min(range.max);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(ScaleBiasClamp::default().apply(0.37), 0.37);
    }

    #[test]
    fn remap_then_scale_bias_then_clamp() {
        let sbc = ScaleBiasClamp {
            map_range: Some((
                FloatRange { min: 0.0, max: 10.0 },
                FloatRange { min: 0.0, max: 1.0 },
            )),
            scale: 2.0,
            bias: 0.1,
            clamp: Some(FloatRange { min: 0.0, max: 1.0 }),
        };
        assert!((sbc.apply(2.5) - 0.6).abs() < 1e-6);
        assert_eq!(sbc.apply(9.0), 1.0);
    }

    #[test]
    fn inverted_clamp_range_settles_on_max() {
        let sbc = ScaleBiasClamp {
            clamp: Some(FloatRange { min: 1.0, max: 0.0 }),
            ..ScaleBiasClamp::default()
        };
        assert_eq!(sbc.apply(0.5), 0.0);
        assert_eq!(sbc.apply(2.0), 0.0);
    }
}
