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

//! Memoized vertex bindings between submeshes and shader programs.
//!
//! Binding a submesh to a program means matching every vertex input the
//! program reads with the submesh attribute at the same location. The result
//! is a device object ([`VertexBindingId`]) that only depends on the pair, so
//! each submesh keeps a [`BindingCache`] keyed by [`ShaderModuleId`] and the
//! [`PipelineStateCache`] fills it on demand.
//!
//! A program rebuilt by a hot reload gets a new `ShaderModuleId`; the bindings
//! of the old identity must be dropped with
//! [`invalidate_shader`](PipelineStateCache::invalidate_shader) before the next
//! frame draws.

use crate::renderer::api::{
    ShaderInputLayout, ShaderModuleId, VertexAttribute, VertexBindingDescriptor, VertexBindingId,
};
use crate::renderer::error::{PipelineError, ResourceError};
use crate::renderer::traits::GraphicsDevice;
use crate::scene::{Mesh, Submesh};
use ahash::AHashMap;
use std::borrow::Cow;

/// A vertex binding created for one shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineBinding {
    /// The device object.
    pub handle: VertexBindingId,
    /// The shader identity the binding was created for.
    pub shader: ShaderModuleId,
}

/// The bindings of one submesh, at most one per shader identity.
#[derive(Debug, Default)]
pub struct BindingCache {
    bindings: AHashMap<ShaderModuleId, PipelineBinding>,
}

impl BindingCache {
    /// The binding for `shader`, if one was created.
    pub fn get(&self, shader: ShaderModuleId) -> Option<&PipelineBinding> {
        self.bindings.get(&shader)
    }

    /// Number of cached bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no binding is cached.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the cached bindings.
    pub fn iter(&self) -> impl Iterator<Item = &PipelineBinding> {
        self.bindings.values()
    }

    fn insert(&mut self, binding: PipelineBinding) {
        let previous = self.bindings.insert(binding.shader, binding);
        debug_assert!(previous.is_none(), "binding for {:?} created twice", binding.shader);
    }

    fn remove(&mut self, shader: ShaderModuleId) -> Option<PipelineBinding> {
        self.bindings.remove(&shader)
    }

    fn drain(&mut self) -> impl Iterator<Item = PipelineBinding> + '_ {
        self.bindings.drain().map(|(_, binding)| binding)
    }
}

/// Hit, miss, creation and eviction counters of a [`PipelineStateCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a submesh cache.
    pub hits: u64,
    /// Lookups that had to create a binding.
    pub misses: u64,
    /// Bindings successfully created.
    pub creations: u64,
    /// Bindings destroyed by invalidation or release.
    pub evictions: u64,
}

/// Creates, memoizes and invalidates vertex bindings.
#[derive(Debug, Default)]
pub struct PipelineStateCache {
    input_layouts: AHashMap<ShaderModuleId, ShaderInputLayout>,
    stats: CacheStats,
}

impl PipelineStateCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The counters accumulated since creation.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns the binding of `mesh.submeshes[submesh_index]` for `shader`,
    /// creating it on first use.
    ///
    /// ## Errors
    /// * `PipelineError::LayoutMismatch` - If the shader reads an input
    ///   location the submesh layout does not provide. Nothing is cached.
    /// * `PipelineError::InvalidSubmesh` - If `submesh_index` is out of range.
    pub fn get_or_create_binding(
        &mut self,
        device: &dyn GraphicsDevice,
        mesh: &mut Mesh,
        submesh_index: usize,
        shader: ShaderModuleId,
    ) -> Result<VertexBindingId, ResourceError> {
        let (vertex_buffer, index_buffer) = (mesh.vertex_buffer, mesh.index_buffer);
        let Some(submesh) = mesh.submeshes.get_mut(submesh_index) else {
            return Err(PipelineError::InvalidSubmesh {
                mesh: mesh.label.clone(),
                index: submesh_index,
            }
            .into());
        };

        if let Some(binding) = submesh.bindings.get(shader) {
            self.stats.hits += 1;
            return Ok(binding.handle);
        }
        self.stats.misses += 1;

        let inputs = self.input_layout(device, shader)?;
        let attributes = match_attributes(submesh, inputs, shader)?;

        let handle = device.create_vertex_binding(&VertexBindingDescriptor {
            label: Some(Cow::Owned(format!("{} [{:?}]", submesh.label, shader))),
            vertex_buffer,
            index_buffer,
            vertex_offset: submesh.vertex_offset,
            stride: submesh.layout.stride,
            attributes: Cow::Owned(attributes),
        })?;
        submesh.bindings.insert(PipelineBinding { handle, shader });
        self.stats.creations += 1;

        log::trace!("Created vertex binding {handle:?} for '{}' with {shader:?}", submesh.label);
        Ok(handle)
    }

    /// Destroys every binding created for `shader` across `meshes` and forgets
    /// its input layout. Returns the number of bindings removed.
    pub fn invalidate_shader<'m>(
        &mut self,
        device: &dyn GraphicsDevice,
        meshes: impl IntoIterator<Item = &'m mut Mesh>,
        shader: ShaderModuleId,
    ) -> usize {
        self.input_layouts.remove(&shader);
        let mut removed = 0;
        for mesh in meshes {
            for submesh in &mut mesh.submeshes {
                if let Some(binding) = submesh.bindings.remove(shader) {
                    destroy_binding(device, binding);
                    removed += 1;
                }
            }
        }
        self.stats.evictions += removed as u64;
        if removed > 0 {
            log::debug!("Invalidated {removed} vertex binding(s) of {shader:?}");
        }
        removed
    }

    /// Destroys every binding of one submesh.
    pub fn release_submesh(&mut self, device: &dyn GraphicsDevice, submesh: &mut Submesh) -> usize {
        let mut removed = 0;
        for binding in submesh.bindings.drain() {
            destroy_binding(device, binding);
            removed += 1;
        }
        self.stats.evictions += removed as u64;
        removed
    }

    /// Destroys every binding of every submesh of `mesh`.
    pub fn release_mesh(&mut self, device: &dyn GraphicsDevice, mesh: &mut Mesh) -> usize {
        mesh.submeshes
            .iter_mut()
            .map(|submesh| self.release_submesh(device, submesh))
            .sum()
    }

    fn input_layout(
        &mut self,
        device: &dyn GraphicsDevice,
        shader: ShaderModuleId,
    ) -> Result<&ShaderInputLayout, ResourceError> {
        if !self.input_layouts.contains_key(&shader) {
            let layout = device.shader_input_layout(shader)?;
            self.input_layouts.insert(shader, layout);
        }
        self.input_layouts
            .get(&shader)
            .ok_or(ResourceError::NotFound)
    }
}

/// Picks, for every shader input, the submesh attribute at the same location.
fn match_attributes(
    submesh: &Submesh,
    inputs: &ShaderInputLayout,
    shader: ShaderModuleId,
) -> Result<Vec<VertexAttribute>, PipelineError> {
    inputs
        .attributes
        .iter()
        .map(|input| {
            submesh
                .layout
                .attribute_at(input.location)
                .copied()
                .ok_or_else(|| PipelineError::LayoutMismatch {
                    shader,
                    location: input.location,
                    submesh: submesh.label.clone(),
                })
        })
        .collect()
}

fn destroy_binding(device: &dyn GraphicsDevice, binding: PipelineBinding) {
    if let Err(e) = device.destroy_vertex_binding(binding.handle) {
        log::warn!(
            "Failed to destroy vertex binding {:?} of {:?}: {e}",
            binding.handle,
            binding.shader
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{VertexFormat, VertexLayout};
    use crate::test_support::MockDevice;

    fn pnt_layout() -> VertexLayout {
        VertexLayout::packed(&[
            (0, VertexFormat::Float32x3),
            (1, VertexFormat::Float32x3),
            (2, VertexFormat::Float32x2),
        ])
    }

    fn mesh(dev: &MockDevice, label: &str, submeshes: usize) -> Mesh {
        let subs = (0..submeshes)
            .map(|i| Submesh::new(format!("{label}/{i}"), pnt_layout(), 0, 0, 3))
            .collect();
        Mesh::create(dev, label, &[0u8; 96], &[0, 1, 2], subs).unwrap()
    }

    #[test]
    fn test_binding_is_memoized() {
        let dev = MockDevice::default();
        let shader = dev.add_shader(&[(0, 3), (1, 3)]);
        let mut m = mesh(&dev, "cube", 1);
        let mut cache = PipelineStateCache::new();

        let a = cache.get_or_create_binding(&dev, &mut m, 0, shader).unwrap();
        let b = cache.get_or_create_binding(&dev, &mut m, 0, shader).unwrap();
        assert_eq!(a, b);
        assert_eq!(m.submeshes[0].bindings().len(), 1);
        assert_eq!(dev.live_binding_count(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                creations: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn test_one_binding_per_shader() {
        let dev = MockDevice::default();
        let depth = dev.add_shader(&[(0, 3)]);
        let geometry = dev.add_shader(&[(0, 3), (1, 3), (2, 2)]);
        let mut m = mesh(&dev, "cube", 2);
        let mut cache = PipelineStateCache::new();

        for _ in 0..3 {
            for sub in 0..2 {
                cache.get_or_create_binding(&dev, &mut m, sub, depth).unwrap();
                cache.get_or_create_binding(&dev, &mut m, sub, geometry).unwrap();
            }
        }
        assert_eq!(m.binding_count(), 4);
        assert_eq!(cache.stats().creations, 4);
        assert!(m.submeshes[1].bindings().get(geometry).is_some());
    }

    #[test]
    fn test_missing_attribute_is_layout_mismatch() {
        let dev = MockDevice::default();
        let shader = dev.add_shader(&[(0, 3), (5, 4)]);
        let mut m = mesh(&dev, "cube", 1);
        let mut cache = PipelineStateCache::new();

        let err = cache
            .get_or_create_binding(&dev, &mut m, 0, shader)
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Pipeline(PipelineError::LayoutMismatch { location: 5, .. })
        ));
        assert_eq!(m.binding_count(), 0);
        assert_eq!(dev.live_binding_count(), 0);
    }

    #[test]
    fn test_invalid_submesh_index() {
        let dev = MockDevice::default();
        let shader = dev.add_shader(&[(0, 3)]);
        let mut m = mesh(&dev, "cube", 1);
        let mut cache = PipelineStateCache::new();
        assert!(matches!(
            cache.get_or_create_binding(&dev, &mut m, 3, shader),
            Err(ResourceError::Pipeline(PipelineError::InvalidSubmesh { index: 3, .. }))
        ));
    }

    #[test]
    fn test_invalidation_removes_exactly_one_identity() {
        let dev = MockDevice::default();
        let old = dev.add_shader(&[(0, 3)]);
        let other = dev.add_shader(&[(0, 3), (2, 2)]);
        let mut meshes = vec![mesh(&dev, "a", 2), mesh(&dev, "b", 1)];
        let mut cache = PipelineStateCache::new();

        for m in meshes.iter_mut() {
            for sub in 0..m.submeshes.len() {
                cache.get_or_create_binding(&dev, m, sub, old).unwrap();
                cache.get_or_create_binding(&dev, m, sub, other).unwrap();
            }
        }
        assert_eq!(dev.live_binding_count(), 6);

        let removed = cache.invalidate_shader(&dev, meshes.iter_mut(), old);
        assert_eq!(removed, 3);
        assert_eq!(dev.live_binding_count(), 3);
        for m in &meshes {
            for sub in &m.submeshes {
                assert!(sub.bindings().get(old).is_none());
                assert!(sub.bindings().get(other).is_some());
            }
        }
        assert_eq!(cache.stats().evictions, 3);

        // Invalidating again is a no-op.
        assert_eq!(cache.invalidate_shader(&dev, meshes.iter_mut(), old), 0);
    }

    #[test]
    fn test_release_mesh_destroys_all_bindings() {
        let dev = MockDevice::default();
        let a = dev.add_shader(&[(0, 3)]);
        let b = dev.add_shader(&[(1, 3)]);
        let mut m = mesh(&dev, "cube", 2);
        let mut cache = PipelineStateCache::new();
        for sub in 0..2 {
            cache.get_or_create_binding(&dev, &mut m, sub, a).unwrap();
            cache.get_or_create_binding(&dev, &mut m, sub, b).unwrap();
        }
        assert_eq!(cache.release_mesh(&dev, &mut m), 4);
        assert_eq!(m.binding_count(), 0);
        assert_eq!(dev.live_binding_count(), 0);
        m.destroy(&dev);
    }
}
