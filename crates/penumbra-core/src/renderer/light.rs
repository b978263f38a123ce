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

//! Scene lights.

use crate::math::{LinearRgba, Vec3};
use serde::{Deserialize, Serialize};

/// The kind of a light. The discriminant is the value written to the
/// `type` field of a light record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum LightKind {
    /// Infinitely distant light shading every pixel.
    Directional = 0,
    /// Omnidirectional light with a finite influence radius.
    Point = 1,
}

impl LightKind {
    /// The code written into the light record.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// A light in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Directional or point.
    pub kind: LightKind,
    /// Linear RGB color, intensity folded in.
    pub color: Vec3,
    /// Direction the light travels. Ignored for point lights.
    pub direction: Vec3,
    /// World position. Ignored for directional lights.
    pub position: Vec3,
}

impl Light {
    /// Creates a directional light.
    pub fn directional(color: LinearRgba, direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            color: color.to_vec3(),
            direction: direction.normalize(),
            position: Vec3::ZERO,
        }
    }

    /// Creates a point light.
    pub fn point(color: LinearRgba, position: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            color: color.to_vec3(),
            direction: Vec3::ZERO,
            position,
        }
    }
}

/// Distance attenuation `1 / (constant + linear * d + quadratic * d²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    /// Constant term.
    pub constant: f32,
    /// Linear term.
    pub linear: f32,
    /// Quadratic term.
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Attenuation {
    /// The attenuation factor at distance `d`.
    pub fn factor(&self, d: f32) -> f32 {
        1.0 / (self.constant + self.linear * d + self.quadratic * d * d)
    }
}
