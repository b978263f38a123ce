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

use crate::renderer::api::{BufferDescriptor, BufferId, BufferUsage, VertexLayout};
use crate::renderer::error::ResourceError;
use crate::renderer::pipeline_cache::BindingCache;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;

/// A contiguous range of a mesh drawn with one material.
#[derive(Debug)]
pub struct Submesh {
    /// Debug label, used in binding labels and errors.
    pub label: String,
    /// Interleaved layout of this submesh's vertices.
    pub layout: VertexLayout,
    /// Byte offset of the first vertex in the mesh's vertex buffer.
    pub vertex_offset: u64,
    /// Index of the first `u32` index in the mesh's index buffer.
    pub first_index: u32,
    /// Number of indices.
    pub index_count: u32,
    pub(crate) bindings: BindingCache,
}

impl Submesh {
    /// Describes a submesh. Bindings are created lazily by the pipeline-state cache.
    pub fn new(
        label: impl Into<String>,
        layout: VertexLayout,
        vertex_offset: u64,
        first_index: u32,
        index_count: u32,
    ) -> Self {
        Self {
            label: label.into(),
            layout,
            vertex_offset,
            first_index,
            index_count,
            bindings: BindingCache::default(),
        }
    }

    /// The cached bindings of this submesh, one per shader at most.
    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }
}

/// GPU geometry: one vertex buffer, one index buffer and the submeshes using them.
#[derive(Debug)]
pub struct Mesh {
    /// Debug label.
    pub label: String,
    /// Vertex buffer shared by every submesh.
    pub vertex_buffer: BufferId,
    /// `u32` index buffer shared by every submesh.
    pub index_buffer: BufferId,
    /// The submeshes.
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    /// Uploads vertex and index data and creates a mesh.
    pub fn create(
        device: &dyn GraphicsDevice,
        label: impl Into<String>,
        vertices: &[u8],
        indices: &[u32],
        submeshes: Vec<Submesh>,
    ) -> Result<Self, ResourceError> {
        let label = label.into();
        let vertex_buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Owned(format!("{label} Vertices"))),
                size: vertices.len() as u64,
                usage: BufferUsage::VERTEX,
            },
            vertices,
        )?;
        let index_buffer = device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Owned(format!("{label} Indices"))),
                size: std::mem::size_of_val(indices) as u64,
                usage: BufferUsage::INDEX,
            },
            bytemuck::cast_slice(indices),
        );
        let index_buffer = match index_buffer {
            Ok(id) => id,
            Err(e) => {
                if let Err(destroy) = device.destroy_buffer(vertex_buffer) {
                    log::warn!("Failed to destroy vertex buffer of mesh '{label}': {destroy}");
                }
                return Err(e);
            }
        };
        Ok(Self {
            label,
            vertex_buffer,
            index_buffer,
            submeshes,
        })
    }

    /// Total number of cached bindings across all submeshes.
    pub fn binding_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.bindings.len()).sum()
    }

    /// Destroys the GPU buffers. Bindings must already have been released
    /// through the pipeline-state cache.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        debug_assert_eq!(self.binding_count(), 0, "mesh '{}' still has bindings", self.label);
        for id in [self.vertex_buffer, self.index_buffer] {
            if let Err(e) = device.destroy_buffer(id) {
                log::warn!("Failed to destroy buffer {id:?} of mesh '{}': {e}", self.label);
            }
        }
    }
}
