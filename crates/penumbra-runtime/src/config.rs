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


//! Runtime configuration, read from JSON.

use anyhow::{Context, Result};
use penumbra_core::math::{Extent2D, LinearRgba, Vec3};
use penumbra_core::renderer::light::Light;
use penumbra_core::RenderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The demo scene to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Cubes per side of the grid.
    pub grid: u32,
    /// Distance between neighbouring cubes.
    pub spacing: f32,
    /// Eye position.
    pub camera_position: Vec3,
    /// Point the camera looks at.
    pub camera_target: Vec3,
    /// Every light of the scene.
    pub lights: Vec<Light>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid: 3,
            spacing: 2.0,
            camera_position: Vec3::new(0.0, 4.0, 9.0),
            camera_target: Vec3::ZERO,
            lights: vec![
                Light::directional(LinearRgba::rgb(0.3, 0.3, 0.3), Vec3::new(-1.0, -1.0, -1.0)),
                Light::point(LinearRgba::RED, Vec3::new(6.0, 0.0, 0.0)),
                Light::point(LinearRgba::rgb(0.2, 0.4, 1.0), Vec3::new(-3.0, 1.5, 2.0)),
            ],
        }
    }
}

/// Everything the runtime needs to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Size of the render targets.
    pub viewport: Extent2D,
    /// Frames to render before exiting.
    pub frames: u32,
    /// Directory of `<program>.glsl` overrides, hot reloaded between frames.
    pub shader_dir: Option<PathBuf>,
    /// Frame pipeline settings.
    pub settings: RenderSettings,
    /// The demo scene.
    pub scene: SceneConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            viewport: Extent2D::new(1280, 720),
            frames: 3,
            shader_dir: None,
            settings: RenderSettings::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parses a configuration. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("failed to parse config '{}'", path.display()))
    }
}
