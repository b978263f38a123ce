// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Screen footprint of lights for the volumetric lighting pass.
//!
//! A point light only shades pixels within the distance at which its
//! attenuated intensity drops below a visibility threshold. The lighting pass
//! draws a sphere of that radius (with front-face culling) instead of a
//! full-screen quad. Directional lights always cover the whole screen.

use crate::math::{Mat4, Vec3};
use crate::renderer::light::{Attenuation, Light, LightKind};

/// The default visibility threshold, five steps of an 8-bit channel.
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 5.0 / 256.0;
/// The default smallest radius a point light volume may have.
pub const DEFAULT_MIN_RADIUS: f32 = 1e-3;
/// The default radius of a light that never falls below the threshold.
pub const DEFAULT_MAX_RADIUS: f32 = 1.0e4;

/// The geometry the lighting pass draws for one light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightVolume {
    /// A full-screen quad.
    FullScreen,
    /// A sphere around the light.
    Sphere {
        /// Sphere center.
        center: Vec3,
        /// Sphere radius.
        radius: f32,
    },
}

impl LightVolume {
    /// The world matrix of the unit sphere mesh for this volume.
    ///
    /// Returns `None` for full-screen volumes, which are drawn in clip space.
    pub fn world_matrix(&self) -> Option<Mat4> {
        match *self {
            LightVolume::FullScreen => None,
            LightVolume::Sphere { center, radius } => {
                Some(Mat4::from_translation_uniform_scale(center, radius))
            }
        }
    }
}

/// Computes the effective radius of point lights and their bounding volumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightVolumeCuller {
    /// Attenuation applied to every point light.
    pub attenuation: Attenuation,
    /// Intensity below which a light no longer contributes.
    pub threshold: f32,
    /// Lower clamp of the radius.
    pub min_radius: f32,
    /// Upper clamp of the radius.
    pub max_radius: f32,
}

impl Default for LightVolumeCuller {
    fn default() -> Self {
        Self {
            attenuation: Attenuation::default(),
            threshold: DEFAULT_VISIBILITY_THRESHOLD,
            min_radius: DEFAULT_MIN_RADIUS,
            max_radius: DEFAULT_MAX_RADIUS,
        }
    }
}

impl LightVolumeCuller {
    /// Creates a culler with the given attenuation and default clamps.
    pub fn new(attenuation: Attenuation) -> Self {
        Self {
            attenuation,
            ..Default::default()
        }
    }

    /// The distance at which a light of `color` drops to the visibility threshold.
    ///
    /// Solves `peak / (c + l·d + q·d²) = threshold` for `d`, with
    /// `peak = max(r, g, b)`. The result is non-decreasing in `peak` and always
    /// inside `[min_radius, max_radius]`. A non-positive threshold is never
    /// reached, so any lit color gets `max_radius`.
    pub fn radius(&self, color: Vec3) -> f32 {
        let peak = color.max_element();
        if !peak.is_finite() || peak <= 0.0 {
            return self.min_radius;
        }
        if self.threshold.is_nan() || self.threshold <= 0.0 {
            return self.max_radius;
        }

        let Attenuation {
            constant: c,
            linear: l,
            quadratic: q,
        } = self.attenuation;
        let target = peak / self.threshold;

        let d = if q > 0.0 {
            let discriminant = l * l - 4.0 * q * (c - target);
            (-l + discriminant.sqrt()) / (2.0 * q)
        } else if l > 0.0 {
            (target - c) / l
        } else if c < target {
            // No distance term: the light never attenuates.
            return self.max_radius;
        } else {
            return self.min_radius;
        };

        if !d.is_finite() || d <= 0.0 {
            self.min_radius
        } else {
            d.clamp(self.min_radius, self.max_radius)
        }
    }

    /// The volume the lighting pass draws for `light`.
    pub fn volume(&self, light: &Light) -> LightVolume {
        match light.kind {
            LightKind::Directional => LightVolume::FullScreen,
            LightKind::Point => LightVolume::Sphere {
                center: light.position,
                radius: self.radius(light.color),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::LinearRgba;
    use approx::assert_relative_eq;

    #[test]
    fn test_red_light_radius_matches_closed_form() {
        let culler = LightVolumeCuller::default();
        let d = culler.radius(Vec3::new(1.0, 0.0, 0.0));

        let (c, l, q) = (1.0f32, 0.09f32, 0.032f32);
        let expected = (-l + (l * l - 4.0 * q * (c - 256.0 / 5.0)).sqrt()) / (2.0 * q);
        assert_relative_eq!(d, expected, epsilon = 1e-4);
        assert_relative_eq!(culler.attenuation.factor(d), 5.0 / 256.0, epsilon = 1e-5);
    }

    #[test]
    fn test_black_light_is_clamped() {
        let culler = LightVolumeCuller::default();
        assert_eq!(culler.radius(Vec3::ZERO), culler.min_radius);
        assert_eq!(culler.radius(Vec3::new(-1.0, -2.0, -3.0)), culler.min_radius);
    }

    #[test]
    fn test_dim_light_does_not_produce_nan() {
        let culler = LightVolumeCuller::default();
        let r = culler.radius(Vec3::new(0.001, 0.0, 0.0));
        assert!(r.is_finite());
        assert_eq!(r, culler.min_radius);
    }

    #[test]
    fn test_radius_is_monotonic_in_peak() {
        let culler = LightVolumeCuller::default();
        let mut previous = 0.0;
        for i in 0..=200 {
            let peak = i as f32 * 0.05;
            let r = culler.radius(Vec3::new(peak, peak * 0.5, 0.0));
            assert!(r >= previous, "radius decreased at peak {peak}");
            previous = r;
        }
    }

    #[test]
    fn test_linear_fallback_without_quadratic_term() {
        let culler = LightVolumeCuller::new(Attenuation {
            constant: 1.0,
            linear: 0.5,
            quadratic: 0.0,
        });
        let d = culler.radius(Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(d, (256.0 / 5.0 - 1.0) / 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_light_without_falloff_clamps_to_max() {
        let culler = LightVolumeCuller::new(Attenuation {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        });
        assert_eq!(culler.radius(Vec3::ONE), culler.max_radius);
    }

    #[test]
    fn test_radius_grows_as_threshold_falls_to_zero() {
        let color = Vec3::new(1.0, 0.5, 0.0);
        let mut culler = LightVolumeCuller::default();
        let mut previous = 0.0;
        for threshold in [0.1, 1e-3, 1e-6, 1e-30, 0.0, -1.0] {
            culler.threshold = threshold;
            let r = culler.radius(color);
            assert!(r >= previous, "threshold {threshold}: {r} < {previous}");
            previous = r;
        }
        assert_eq!(previous, culler.max_radius);
        assert_eq!(culler.radius(Vec3::ZERO), culler.min_radius);
    }

    #[test]
    fn test_volumes_by_kind() {
        let culler = LightVolumeCuller::default();
        let sun = Light::directional(LinearRgba::WHITE, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(culler.volume(&sun), LightVolume::FullScreen);
        assert!(culler.volume(&sun).world_matrix().is_none());

        let lamp = Light::point(LinearRgba::RED, Vec3::new(0.0, 0.0, -6.0));
        match culler.volume(&lamp) {
            LightVolume::Sphere { center, radius } => {
                assert_eq!(center, lamp.position);
                assert!(radius > 6.0);
            }
            other => panic!("expected a sphere, got {other:?}"),
        }
        let m = culler.volume(&lamp).world_matrix().unwrap();
        assert_eq!(m.translation(), lamp.position);
    }
}
