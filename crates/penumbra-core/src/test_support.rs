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

//! A minimal in-memory device for unit tests.

use crate::math::Extent2D;
use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, ShaderError};
use crate::renderer::traits::{CommandEncoder, GraphicsDevice, RenderPass};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct MockDevice {
    next_id: AtomicUsize,
    pub limits: DeviceLimits,
    pub buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    pub shader_inputs: Mutex<HashMap<ShaderModuleId, ShaderInputLayout>>,
    pub live_bindings: Mutex<HashSet<VertexBindingId>>,
    pub bindings_created: AtomicUsize,
}

impl MockDevice {
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Registers a shader whose vertex inputs are the given `(location, components)` pairs.
    pub fn add_shader(&self, inputs: &[(u32, u8)]) -> ShaderModuleId {
        let id = ShaderModuleId(self.next());
        let attributes = inputs
            .iter()
            .map(|&(location, component_count)| ShaderInputAttribute {
                location,
                component_count,
            })
            .collect();
        self.shader_inputs
            .lock()
            .unwrap()
            .insert(id, ShaderInputLayout { attributes });
        id
    }

    pub fn buffer_contents(&self, id: BufferId) -> Vec<u8> {
        self.buffers.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    pub fn live_binding_count(&self) -> usize {
        self.live_bindings.lock().unwrap().len()
    }
}

impl GraphicsDevice for MockDevice {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Mock".to_string(),
            backend: "None".to_string(),
            device_type: DeviceType::Cpu,
        }
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_shader_module(
        &self,
        _descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        Ok(self.add_shader(&[]))
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        self.shader_inputs.lock().unwrap().remove(&id);
        Ok(())
    }

    fn shader_input_layout(&self, id: ShaderModuleId) -> Result<ShaderInputLayout, ResourceError> {
        self.shader_inputs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ShaderError::NotFound { id }.into())
    }

    fn create_render_pipeline(
        &self,
        _descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        Ok(RenderPipelineId(self.next()))
    }

    fn destroy_render_pipeline(&self, _id: RenderPipelineId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next());
        self.buffers
            .lock()
            .unwrap()
            .insert(id, vec![0; descriptor.size as usize]);
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        _descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next());
        self.buffers.lock().unwrap().insert(id, data.to_vec());
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle)?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        Ok(TextureId(self.next()))
    }

    fn destroy_texture(&self, _id: TextureId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn write_texture(&self, _id: TextureId, _data: &[u8]) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_texture_view(
        &self,
        _texture_id: TextureId,
        _descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        Ok(TextureViewId(self.next()))
    }

    fn destroy_texture_view(&self, _id: TextureViewId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_sampler(&self, _descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        Ok(SamplerId(self.next()))
    }

    fn destroy_sampler(&self, _id: SamplerId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_vertex_binding(
        &self,
        _descriptor: &VertexBindingDescriptor,
    ) -> Result<VertexBindingId, ResourceError> {
        let id = VertexBindingId(self.next());
        self.live_bindings.lock().unwrap().insert(id);
        self.bindings_created.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    fn destroy_vertex_binding(&self, id: VertexBindingId) -> Result<(), ResourceError> {
        if self.live_bindings.lock().unwrap().remove(&id) {
            Ok(())
        } else {
            Err(ResourceError::InvalidHandle)
        }
    }

    fn validate_framebuffer(&self, _descriptor: &FramebufferDescriptor) -> FramebufferStatus {
        FramebufferStatus::Complete
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockEncoder)
    }

    fn submit_command_buffer(&self, _command_buffer: CommandBufferId) -> Result<(), ResourceError> {
        Ok(())
    }
}

struct MockEncoder;
struct MockPass;

impl RenderPass for MockPass {
    fn set_pipeline(&mut self, _pipeline: RenderPipelineId) {}
    fn set_vertex_binding(&mut self, _binding: VertexBindingId) {}
    fn set_constant_block(&mut self, _slot: u32, _buffer: BufferId, _offset: u64, _size: u64) {}
    fn set_texture(&mut self, _slot: u32, _view: TextureViewId, _sampler: SamplerId) {}
    fn set_push_constants(&mut self, _offset: u32, _data: &[u8]) {}
    fn draw(&mut self, _vertices: Range<u32>, _instances: Range<u32>) {}
    fn draw_indexed(&mut self, _indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {}
}

impl CommandEncoder for MockEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        _descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        Box::new(MockPass)
    }

    fn copy_texture_to_texture(&mut self, _source: TextureId, _destination: TextureId, _size: Extent2D) {}

    fn finish(self: Box<Self>) -> CommandBufferId {
        CommandBufferId(0)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
