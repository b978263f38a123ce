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

//! Internal meshes: the full-screen quad and the unit light-volume sphere.

use penumbra_core::math::{Vec2, Vec3, PI, TAU};
use penumbra_core::renderer::{GraphicsDevice, ResourceError, VertexFormat, VertexLayout};
use penumbra_core::scene::{Mesh, Submesh};

const SPHERE_STACKS: u32 = 12;
const SPHERE_SECTORS: u32 = 24;

/// Which internal mesh to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Clip-space quad covering the screen, with UVs.
    FullScreenQuad,
    /// Sphere of radius 1 around the origin.
    UnitSphere,
}

/// Owns the internal meshes. They go through the same binding cache as scene meshes.
#[derive(Debug)]
pub struct Primitives {
    meshes: Vec<Mesh>,
}

impl Primitives {
    /// Uploads both primitives.
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let quad = full_screen_quad(device)?;
        match unit_sphere(device) {
            Ok(sphere) => Ok(Self {
                meshes: vec![quad, sphere],
            }),
            Err(e) => {
                quad.destroy(device);
                Err(e)
            }
        }
    }

    fn slot(primitive: Primitive) -> usize {
        match primitive {
            Primitive::FullScreenQuad => 0,
            Primitive::UnitSphere => 1,
        }
    }

    /// The mesh of a primitive.
    pub fn mesh(&self, primitive: Primitive) -> &Mesh {
        &self.meshes[Self::slot(primitive)]
    }

    /// The mesh of a primitive, mutably for binding creation.
    pub fn mesh_mut(&mut self, primitive: Primitive) -> &mut Mesh {
        &mut self.meshes[Self::slot(primitive)]
    }

    /// Every primitive mesh.
    pub fn meshes_mut(&mut self) -> impl Iterator<Item = &mut Mesh> {
        self.meshes.iter_mut()
    }

    /// Destroys the meshes. Bindings must have been released.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        for mesh in self.meshes {
            mesh.destroy(device);
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadVertex {
    position: Vec3,
    uv: Vec2,
}

fn full_screen_quad(device: &dyn GraphicsDevice) -> Result<Mesh, ResourceError> {
    let vertex = |x: f32, y: f32, u: f32, v: f32| QuadVertex {
        position: Vec3::new(x, y, 0.0),
        uv: Vec2::new(u, v),
    };
    let vertices = [
        vertex(-1.0, -1.0, 0.0, 0.0),
        vertex(1.0, -1.0, 1.0, 0.0),
        vertex(1.0, 1.0, 1.0, 1.0),
        vertex(-1.0, 1.0, 0.0, 1.0),
    ];
    let indices = [0u32, 1, 2, 0, 2, 3];
    let layout = VertexLayout::packed(&[(0, VertexFormat::Float32x3), (1, VertexFormat::Float32x2)]);
    Mesh::create(
        device,
        "Full-screen Quad",
        bytemuck::cast_slice(&vertices),
        &indices,
        vec![Submesh::new("Full-screen Quad", layout, 0, 0, indices.len() as u32)],
    )
}

/// Positions and counter-clockwise (outward) triangle indices of a UV sphere.
pub(crate) fn sphere_geometry(stacks: u32, sectors: u32) -> (Vec<Vec3>, Vec<u32>) {
    let mut positions = Vec::with_capacity(((stacks + 1) * (sectors + 1)) as usize);
    for i in 0..=stacks {
        let phi = PI * i as f32 / stacks as f32;
        let (ring, y) = (phi.sin(), phi.cos());
        for j in 0..=sectors {
            let theta = TAU * j as f32 / sectors as f32;
            positions.push(Vec3::new(ring * theta.cos(), y, -ring * theta.sin()));
        }
    }

    let mut indices = Vec::with_capacity((stacks * sectors * 6) as usize);
    let row = sectors + 1;
    for i in 0..stacks {
        for j in 0..sectors {
            let a = i * row + j;
            let b = a + row;
            if i != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if i != stacks - 1 {
                indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }
    (positions, indices)
}

fn unit_sphere(device: &dyn GraphicsDevice) -> Result<Mesh, ResourceError> {
    let (positions, indices) = sphere_geometry(SPHERE_STACKS, SPHERE_SECTORS);
    let layout = VertexLayout::packed(&[(0, VertexFormat::Float32x3)]);
    Mesh::create(
        device,
        "Light Volume Sphere",
        bytemuck::cast_slice(&positions),
        &indices,
        vec![Submesh::new("Light Volume Sphere", layout, 0, 0, indices.len() as u32)],
    )
}
