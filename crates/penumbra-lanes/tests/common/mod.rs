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


//! Fixtures shared by the frame pipeline tests.

#![allow(dead_code)]

use penumbra_core::math::{Extent2D, LinearRgba, Mat4, Vec3};
use penumbra_core::renderer::{DeviceLimits, GraphicsDevice, VertexFormat, VertexLayout};
use penumbra_core::scene::{Material, Mesh, Model, Submesh};
use penumbra_core::RenderSettings;
use penumbra_infra::{FileProgramStore, HeadlessDevice};
use penumbra_lanes::{FramePipeline, RenderContext};
use std::path::Path;
use std::sync::Arc;

pub const VIEWPORT: Extent2D = Extent2D::new(64, 48);

/// A device, a context on it and a program store.
pub struct Harness {
    pub device: HeadlessDevice,
    pub ctx: RenderContext,
    pub programs: FileProgramStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        let device = HeadlessDevice::with_limits(limits);
        let ctx = RenderContext::new(Arc::new(device.clone()), VIEWPORT).unwrap();
        Self {
            device,
            ctx,
            programs: FileProgramStore::new(),
        }
    }

    pub fn pipeline(&mut self, settings: RenderSettings) -> FramePipeline {
        self.pipeline_with_shaders(settings, None)
    }

    pub fn pipeline_with_shaders(
        &mut self,
        settings: RenderSettings,
        shader_dir: Option<&Path>,
    ) -> FramePipeline {
        FramePipeline::new(&self.ctx, &mut self.programs, settings, shader_dir).unwrap()
    }

    /// Adds a cube mesh with one submesh, a material and a model, and
    /// returns the model index.
    pub fn add_cube_model(&mut self, material: Material) -> usize {
        let mesh = cube_mesh(self.ctx.device.as_ref());
        let mesh_index = self.ctx.assets.add_mesh(mesh);
        let material_index = self.ctx.assets.add_material(material);
        self.ctx.assets.add_model(Model {
            mesh_index,
            material_indices: vec![material_index],
        })
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CubeVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

/// A unit cube with positions, normals and texture coordinates at
/// locations 0, 1 and 2.
pub fn cube_mesh(device: &dyn GraphicsDevice) -> Mesh {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [0, 1, 2].map(|i| 0.5 * (normal[i] + su * u[i] + sv * v[i]));
            vertices.push(CubeVertex {
                position,
                normal,
                uv: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    let layout = VertexLayout::packed(&[
        (0, VertexFormat::Float32x3),
        (1, VertexFormat::Float32x3),
        (2, VertexFormat::Float32x2),
    ]);
    Mesh::create(
        device,
        "Cube",
        bytemuck::cast_slice(&vertices),
        &indices,
        vec![Submesh::new("Cube", layout, 0, 0, indices.len() as u32)],
    )
    .unwrap()
}

pub fn at(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

pub fn grey() -> Material {
    Material::new("Grey", LinearRgba::rgb(0.5, 0.5, 0.5))
}
