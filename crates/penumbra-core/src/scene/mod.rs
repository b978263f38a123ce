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

//! Scene and asset records a frame is built from.
//!
//! Everything is stored in arenas and referenced by index: an [`Entity`]
//! points at a [`Model`] by index, a model at a [`Mesh`] and its
//! [`Material`]s by index, a material at its textures by index.

mod camera;
mod material;
mod mesh;

pub use self::camera::Camera;
pub use self::material::{Material, Placeholder, Texture, TextureSlot, TextureTable};
pub use self::mesh::{Mesh, Submesh};

use crate::math::{LinearRgba, Mat4};
use crate::renderer::constant::ConstantRegion;
use crate::renderer::light::Light;

/// A renderable asset: a mesh and one material per submesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Index into [`AssetTables::meshes`].
    pub mesh_index: usize,
    /// Material index per submesh, into [`AssetTables::materials`].
    pub material_indices: Vec<usize>,
}

/// An instance of a model in the scene.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Object-to-world transform.
    pub world_matrix: Mat4,
    /// Index into [`AssetTables::models`].
    pub model_index: usize,
    /// The local constant block written for this entity in the current frame.
    pub local_region: Option<ConstantRegion>,
}

impl Entity {
    /// Creates an entity placing `model_index` at `world_matrix`.
    pub fn new(model_index: usize, world_matrix: Mat4) -> Self {
        Self {
            world_matrix,
            model_index,
            local_region: None,
        }
    }
}

/// What the renderer draws.
#[derive(Debug, Clone)]
pub struct Scene {
    /// The viewpoint.
    pub camera: Camera,
    /// Every light, in the order they are written to the global block.
    pub lights: Vec<Light>,
    /// Every model instance.
    pub entities: Vec<Entity>,
    /// The color the final composite is cleared to.
    pub clear_color: LinearRgba,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            lights: Vec::new(),
            entities: Vec::new(),
            clear_color: LinearRgba::BLACK,
        }
    }
}

/// The asset arenas.
#[derive(Debug)]
pub struct AssetTables {
    /// Meshes, each owning its GPU buffers and binding caches.
    pub meshes: Vec<Mesh>,
    /// Models.
    pub models: Vec<Model>,
    /// Materials.
    pub materials: Vec<Material>,
    /// Textures, including the placeholders.
    pub textures: TextureTable,
}

impl AssetTables {
    /// Creates empty tables around an existing texture table.
    pub fn new(textures: TextureTable) -> Self {
        Self {
            meshes: Vec::new(),
            models: Vec::new(),
            materials: Vec::new(),
            textures,
        }
    }

    /// Adds a mesh and returns its index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Adds a material and returns its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Adds a model and returns its index.
    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }
}
