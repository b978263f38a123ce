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

//! The six lanes of the deferred frame.

mod composite;
mod depth_prepass;
mod geometry;
mod lighting;
mod ssao;
mod ssao_blur;

pub use composite::CompositeLane;
pub use depth_prepass::DepthPrePassLane;
pub use geometry::GeometryLane;
pub use lighting::LightingLane;
pub use ssao::SsaoLane;
pub use ssao_blur::SsaoBlurLane;

use penumbra_core::renderer::constant::ConstantRegion;
use penumbra_core::scene::{AssetTables, Scene};

/// One indexed draw of a scene submesh.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SceneDraw {
    pub mesh_index: usize,
    pub submesh_index: usize,
    pub first_index: u32,
    pub index_count: u32,
    pub material_index: Option<usize>,
    pub local_region: ConstantRegion,
}

/// Flattens the scene into submesh draws.
///
/// Entities with a dangling model or mesh index, or without a local region,
/// are skipped with a warning.
pub(crate) fn scene_draws(assets: &AssetTables, scene: &Scene) -> Vec<SceneDraw> {
    let mut draws = Vec::new();
    for (entity_index, entity) in scene.entities.iter().enumerate() {
        let Some(model) = assets.models.get(entity.model_index) else {
            log::warn!(
                "Entity {entity_index} references missing model {}, skipped",
                entity.model_index
            );
            continue;
        };
        let Some(mesh) = assets.meshes.get(model.mesh_index) else {
            log::warn!(
                "Model {} references missing mesh {}, skipped",
                entity.model_index,
                model.mesh_index
            );
            continue;
        };
        let Some(local_region) = entity.local_region else {
            log::warn!("Entity {entity_index} has no constants this frame, skipped");
            continue;
        };
        for (submesh_index, submesh) in mesh.submeshes.iter().enumerate() {
            draws.push(SceneDraw {
                mesh_index: model.mesh_index,
                submesh_index,
                first_index: submesh.first_index,
                index_count: submesh.index_count,
                material_index: model.material_indices.get(submesh_index).copied(),
                local_region,
            });
        }
    }
    draws
}

