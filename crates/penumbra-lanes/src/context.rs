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

//! The state a frame is rendered from.

use penumbra_core::math::Extent2D;
use penumbra_core::renderer::{GraphicsDevice, ResourceError};
use penumbra_core::scene::{AssetTables, Scene, TextureTable};
use std::sync::Arc;

/// The device, the asset arenas and the scene, passed explicitly to the
/// frame pipeline.
pub struct RenderContext {
    /// The device every resource lives on.
    pub device: Arc<dyn GraphicsDevice>,
    /// Meshes, models, materials and textures.
    pub assets: AssetTables,
    /// What to draw.
    pub scene: Scene,
    /// The size of the surface. Zero sizes are clamped to 1x1 by the targets.
    pub viewport: Extent2D,
}

impl RenderContext {
    /// Creates a context with empty assets, including the placeholder textures.
    pub fn new(device: Arc<dyn GraphicsDevice>, viewport: Extent2D) -> Result<Self, ResourceError> {
        let textures = TextureTable::new(device.as_ref())?;
        Ok(Self {
            device,
            assets: AssetTables::new(textures),
            scene: Scene::default(),
            viewport,
        })
    }

    /// Destroys every mesh and texture. Bindings must have been released by
    /// the pipeline first.
    pub fn destroy(self) {
        let device = self.device.as_ref();
        for mesh in self.assets.meshes {
            mesh.destroy(device);
        }
        self.assets.textures.destroy(device);
    }
}
