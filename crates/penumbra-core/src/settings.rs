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

//! Renderer settings.
//!
//! Every field has a default so a partial JSON document deserializes into a
//! complete configuration.

use crate::math::LinearRgba;
use crate::renderer::light::Attenuation;
use crate::renderer::light_volume::{
    LightVolumeCuller, DEFAULT_MAX_RADIUS, DEFAULT_MIN_RADIUS, DEFAULT_VISIBILITY_THRESHOLD,
};
use serde::{Deserialize, Serialize};

/// The attachment shown by the composite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayAttachment {
    /// G-buffer world positions.
    Position,
    /// G-buffer normals.
    Normal,
    /// G-buffer albedo and specular.
    Albedo,
    /// Linearized depth as grayscale.
    DepthView,
    /// Raw ambient occlusion.
    AmbientOcclusion,
    /// Blurred ambient occlusion.
    BlurredAmbientOcclusion,
    /// The lit image.
    #[default]
    FinalComposite,
}

/// Screen-space ambient occlusion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoSettings {
    /// Number of hemisphere samples.
    pub kernel_size: usize,
    /// Side of the square rotation-noise texture.
    pub noise_dimension: u32,
    /// Sampling radius in view space.
    pub radius: f32,
    /// Depth bias against self-occlusion.
    pub bias: f32,
    /// Seed of the kernel and noise generator.
    pub seed: u64,
}

impl Default for SsaoSettings {
    fn default() -> Self {
        Self {
            kernel_size: 64,
            noise_dimension: 4,
            radius: 0.5,
            bias: 0.025,
            seed: 0x5EED,
        }
    }
}

/// Settings of the frame pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Attachment shown by the composite pass.
    pub display: DisplayAttachment,
    /// Point-light attenuation.
    pub attenuation: Attenuation,
    /// Intensity below which a point light stops contributing.
    pub visibility_threshold: f32,
    /// Smallest light volume radius.
    pub min_light_radius: f32,
    /// Largest light volume radius.
    pub max_light_radius: f32,
    /// Ambient occlusion parameters.
    pub ssao: SsaoSettings,
    /// Upper bound of the constant buffer size, below the device maximum.
    pub constant_buffer_cap: Option<u64>,
    /// Clear color used when building a scene from configuration.
    pub clear_color: LinearRgba,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            display: DisplayAttachment::default(),
            attenuation: Attenuation::default(),
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            min_light_radius: DEFAULT_MIN_RADIUS,
            max_light_radius: DEFAULT_MAX_RADIUS,
            ssao: SsaoSettings::default(),
            constant_buffer_cap: None,
            clear_color: LinearRgba::BLACK,
        }
    }
}

impl RenderSettings {
    /// The light volume culler these settings describe.
    pub fn light_volume_culler(&self) -> LightVolumeCuller {
        LightVolumeCuller {
            attenuation: self.attenuation,
            threshold: self.visibility_threshold,
            min_radius: self.min_light_radius,
            max_radius: self.max_light_radius,
        }
    }
}
