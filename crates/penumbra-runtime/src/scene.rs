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


//! The demo scene: a grid of cubes on a floor slab.

use crate::config::SceneConfig;
use anyhow::{Context, Result};
use penumbra_core::math::{Extent2D, LinearRgba, Mat4, Vec3};
use penumbra_core::renderer::{GraphicsDevice, ResourceError, VertexFormat, VertexLayout};
use penumbra_core::scene::{Camera, Entity, Material, Mesh, Model, Submesh};
use penumbra_lanes::RenderContext;
use std::path::Path;

const CHECKER_SIZE: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

/// One face per axis direction: outward normal and the two tangent axes.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

fn cube_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in CUBE_FACES {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(Vertex {
                position: [0, 1, 2].map(|i| 0.5 * (normal[i] + su * u[i] + sv * v[i])),
                normal,
                uv: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// A unit cube centered on the origin. The first submesh holds the side
/// faces, the second the top and bottom, so each can carry its own material.
fn create_cube(device: &dyn GraphicsDevice) -> Result<Mesh, ResourceError> {
    let (vertices, indices) = cube_geometry();
    let layout = || {
        VertexLayout::packed(&[
            (0, VertexFormat::Float32x3),
            (1, VertexFormat::Float32x3),
            (2, VertexFormat::Float32x2),
        ])
    };
    // Faces 0, 1 are +-X, 2, 3 are +-Y, 4, 5 are +-Z.
    let mut reordered = Vec::with_capacity(indices.len());
    for face in [0, 1, 4, 5, 2, 3] {
        reordered.extend_from_slice(&indices[face * 6..face * 6 + 6]);
    }
    Mesh::create(
        device,
        "Cube",
        bytemuck::cast_slice(&vertices),
        &reordered,
        vec![
            Submesh::new("Cube Sides", layout(), 0, 0, 24),
            Submesh::new("Cube Caps", layout(), 0, 24, 12),
        ],
    )
}

fn checker_pixels(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let value = if (x + y) % 2 == 0 { 230 } else { 40 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    pixels
}

/// Fills `ctx` with the demo scene described by `config`.
///
/// Every cube shares one mesh and one model; the floor is the same cube
/// flattened. The camera, lights and clear color replace the current ones.
pub fn build_demo_scene(
    ctx: &mut RenderContext,
    config: &SceneConfig,
    clear_color: LinearRgba,
) -> Result<()> {
    let device = ctx.device.as_ref();
    let cube = create_cube(device).context("failed to create the cube mesh")?;
    let mesh_index = ctx.assets.add_mesh(cube);

    let checker = ctx
        .assets
        .textures
        .add_rgba8(
            device,
            Some(Path::new("procedural/checker")),
            Extent2D::new(CHECKER_SIZE, CHECKER_SIZE),
            &checker_pixels(CHECKER_SIZE),
        )
        .context("failed to upload the checker texture")?;

    let mut sides = Material::new("Checker", LinearRgba::WHITE);
    sides.albedo_texture = Some(checker);
    sides.smoothness = 0.6;
    let sides = ctx.assets.add_material(sides);
    let caps = ctx
        .assets
        .add_material(Material::new("Caps", LinearRgba::rgb(0.8, 0.7, 0.5)));
    let model = ctx.assets.add_model(Model {
        mesh_index,
        material_indices: vec![sides, caps],
    });

    let scene = &mut ctx.scene;
    scene.entities.clear();
    let extent = config.grid as f32 * config.spacing;
    scene.entities.push(Entity::new(
        model,
        Mat4::from_translation(Vec3::new(0.0, -0.05, 0.0))
            * Mat4::from_scale(Vec3::new(extent, 0.1, extent)),
    ));

    let offset = (config.grid.saturating_sub(1)) as f32 * config.spacing * 0.5;
    for row in 0..config.grid {
        for column in 0..config.grid {
            let position = Vec3::new(
                column as f32 * config.spacing - offset,
                0.5,
                row as f32 * config.spacing - offset,
            );
            scene
                .entities
                .push(Entity::new(model, Mat4::from_translation(position)));
        }
    }

    scene.lights = config.lights.clone();
    scene.camera = Camera::new(config.camera_position, config.camera_target);
    scene.clear_color = clear_color;

    log::info!(
        "Demo scene: {} entities, {} lights, {} textures",
        scene.entities.len(),
        scene.lights.len(),
        ctx.assets.textures.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use penumbra_infra::HeadlessDevice;
    use std::sync::Arc;

    fn context() -> RenderContext {
        RenderContext::new(Arc::new(HeadlessDevice::new()), Extent2D::new(16, 16)).unwrap()
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let (vertices, indices) = cube_geometry();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for triangle in indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| {
                let p = vertices[triangle[i] as usize].position;
                Vec3::new(p[0], p[1], p[2])
            });
            let n = vertices[triangle[0] as usize].normal;
            let winding = (b - a).cross(c - a);
            assert!(winding.dot(Vec3::new(n[0], n[1], n[2])) > 0.0);
        }
    }

    #[test]
    fn test_grid_and_floor_entities() {
        let mut ctx = context();
        let config = SceneConfig {
            grid: 2,
            ..SceneConfig::default()
        };
        build_demo_scene(&mut ctx, &config, LinearRgba::BLACK).unwrap();

        assert_eq!(ctx.scene.entities.len(), 5);
        assert_eq!(ctx.scene.lights, config.lights);
        assert_eq!(ctx.assets.meshes[0].submeshes.len(), 2);
        assert_eq!(ctx.assets.models[0].material_indices.len(), 2);
        let cubes: Vec<Vec3> = ctx.scene.entities[1..]
            .iter()
            .map(|e| e.world_matrix.translation())
            .collect();
        assert!(cubes.contains(&Vec3::new(-1.0, 0.5, -1.0)));
        assert!(cubes.contains(&Vec3::new(1.0, 0.5, 1.0)));
    }

    #[test]
    fn test_rebuilding_reuses_the_checker_texture() {
        let mut ctx = context();
        build_demo_scene(&mut ctx, &SceneConfig::default(), LinearRgba::BLACK).unwrap();
        let textures = ctx.assets.textures.len();
        build_demo_scene(&mut ctx, &SceneConfig::default(), LinearRgba::BLACK).unwrap();
        assert_eq!(ctx.assets.textures.len(), textures);
        assert_eq!(ctx.assets.materials[0].albedo_texture, ctx.assets.materials[2].albedo_texture);
    }
}
