//! Timed alpha blends with easing.
//!
//! `alpha_lerp` is linear progress in 0..=1; the easing option maps it to the
//! blended alpha between `begin` and `desired`.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaBlendOption {
    #[default]
    Linear,
    Cubic,
    HermiteCubic,
    Sinusoidal,
    QuadraticInOut,
    CubicInOut,
    QuarticInOut,
    QuinticInOut,
    CircularIn,
    CircularOut,
    CircularInOut,
    ExpIn,
    ExpOut,
    ExpInOut,
}

#[inline]
fn ease_in_out(a: f32, exp: i32) -> f32 {
    if a < 0.5 {
        0.5 * (2.0 * a).powi(exp)
    } else {
        1.0 - 0.5 * (2.0 * (1.0 - a)).powi(exp)
    }
}

#[inline]
fn circular_in(a: f32) -> f32 {
    1.0 - (1.0 - a * a).max(0.0).sqrt()
}

#[inline]
fn circular_out(a: f32) -> f32 {
    let b = a - 1.0;
    (1.0 - b * b).max(0.0).sqrt()
}

#[inline]
fn exp_in(a: f32) -> f32 {
    if a <= 0.0 {
        0.0
    } else {
        2f32.powf(10.0 * (a - 1.0))
    }
}

#[inline]
fn exp_out(a: f32) -> f32 {
    if a >= 1.0 {
        1.0
    } else {
        1.0 - 2f32.powf(-10.0 * a)
    }
}

impl AlphaBlendOption {
    /// Map linear progress `a` (clamped to 0..=1) to an eased alpha.
    pub fn apply(self, a: f32) -> f32 {
        let a = a.clamp(0.0, 1.0);
        let eased = match self {
            AlphaBlendOption::Linear => a,
            // Hermite with zero end tangents.
            AlphaBlendOption::Cubic => a * a * (3.0 - 2.0 * a),
            AlphaBlendOption::HermiteCubic => {
                let t = a * a;
                3.0 * t - 2.0 * t * a
            }
            AlphaBlendOption::Sinusoidal => ((a * PI - PI * 0.5).sin() + 1.0) * 0.5,
            AlphaBlendOption::QuadraticInOut => ease_in_out(a, 2),
            AlphaBlendOption::CubicInOut => ease_in_out(a, 3),
            AlphaBlendOption::QuarticInOut => ease_in_out(a, 4),
            AlphaBlendOption::QuinticInOut => ease_in_out(a, 5),
            AlphaBlendOption::CircularIn => circular_in(a),
            AlphaBlendOption::CircularOut => circular_out(a),
            AlphaBlendOption::CircularInOut => {
                if a < 0.5 {
                    0.5 * circular_in(2.0 * a)
                } else {
                    0.5 * circular_out(2.0 * a - 1.0) + 0.5
                }
            }
            AlphaBlendOption::ExpIn => exp_in(a),
            AlphaBlendOption::ExpOut => exp_out(a),
            AlphaBlendOption::ExpInOut => {
                if a < 0.5 {
                    0.5 * exp_in(2.0 * a)
                } else {
                    0.5 * exp_out(2.0 * a - 1.0) + 0.5
                }
            }
        };
        eased.clamp(0.0, 1.0)
    }
}

/// Blend from `begin` toward `desired` over `blend_time` seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlphaBlend {
    begin: f32,
    desired: f32,
    blend_time: f32,
    alpha_lerp: f32,
    option: AlphaBlendOption,
}

impl Default for AlphaBlend {
    fn default() -> Self {
        Self::new(0.0, AlphaBlendOption::Linear)
    }
}

impl AlphaBlend {
    pub fn new(blend_time: f32, option: AlphaBlendOption) -> Self {
        let mut blend = Self {
            begin: 0.0,
            desired: 1.0,
            blend_time: blend_time.max(0.0),
            alpha_lerp: 0.0,
            option,
        };
        blend.reset_alpha();
        blend
    }

    /// Current eased value between begin and desired.
    pub fn blended_value(&self) -> f32 {
        self.begin + (self.desired - self.begin) * self.option.apply(self.alpha_lerp)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha_lerp
    }

    pub fn begin(&self) -> f32 {
        self.begin
    }

    pub fn desired(&self) -> f32 {
        self.desired
    }

    pub fn blend_time(&self) -> f32 {
        self.blend_time
    }

    pub fn option(&self) -> AlphaBlendOption {
        self.option
    }

    pub fn set_option(&mut self, option: AlphaBlendOption) {
        self.option = option;
    }

    /// Head toward `desired`, starting from the current blended value.
    pub fn set_desired(&mut self, desired: f32) {
        self.begin = self.blended_value();
        self.desired = desired;
        self.reset_alpha();
    }

    /// Finish the remaining blend over `blend_time`, starting from the current value.
    pub fn set_blend_time(&mut self, blend_time: f32) {
        self.begin = self.blended_value();
        self.blend_time = blend_time.max(0.0);
        self.reset_alpha();
    }

    /// Jump both ends to `value`.
    pub fn set_value(&mut self, value: f32) {
        self.begin = value;
        self.desired = value;
        self.alpha_lerp = 1.0;
    }

    /// Restart progress from `begin`. A zero blend time completes immediately.
    pub fn reset_alpha(&mut self) {
        self.alpha_lerp = if self.blend_time <= 0.0 { 1.0 } else { 0.0 };
    }

    pub fn update(&mut self, delta_time: f32) -> f32 {
        if self.alpha_lerp < 1.0 {
            self.alpha_lerp = if self.blend_time <= 0.0 {
                1.0
            } else {
                (self.alpha_lerp + delta_time / self.blend_time).min(1.0)
            };
        }
        self.blended_value()
    }

    pub fn is_complete(&self) -> bool {
        self.alpha_lerp >= 1.0
    }
}
