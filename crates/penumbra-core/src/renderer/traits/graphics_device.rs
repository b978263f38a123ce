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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// A trait representing a logical graphics device, the main interface for
/// creating and managing GPU resources.
///
/// All methods take `&self`; implementations synchronize internally. The
/// renderer only relies on submission order, never on concurrent use.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Returns information about the adapter behind this device.
    fn adapter_info(&self) -> AdapterInfo;

    /// Returns the device limits the renderer depends on.
    fn limits(&self) -> DeviceLimits;

    /// Compiles a shader program.
    ///
    /// ## Errors
    /// * `ResourceError::Shader` - If the source fails to compile.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys a shader program.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Returns the vertex inputs of a compiled program, sorted by location.
    fn shader_input_layout(&self, id: ShaderModuleId) -> Result<ShaderInputLayout, ResourceError>;

    /// Creates a render pipeline state object.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError>;

    /// Destroys a render pipeline.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError>;

    /// Creates a zero-initialized GPU buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a GPU buffer initialized with `data`. The descriptor size is ignored.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes `data` into a buffer at `offset`.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write exceeds the buffer size.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Creates a 2D texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Uploads tightly packed texel data covering the whole texture.
    fn write_texture(&self, id: TextureId, data: &[u8]) -> Result<(), ResourceError>;

    /// Creates a view of a texture.
    fn create_texture_view(
        &self,
        texture_id: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError>;

    /// Destroys a texture view.
    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a vertex binding associating buffers and attributes with shader inputs.
    fn create_vertex_binding(
        &self,
        descriptor: &VertexBindingDescriptor,
    ) -> Result<VertexBindingId, ResourceError>;

    /// Destroys a vertex binding.
    fn destroy_vertex_binding(&self, id: VertexBindingId) -> Result<(), ResourceError>;

    /// Checks that a set of attachments can be rendered to together.
    fn validate_framebuffer(&self, descriptor: &FramebufferDescriptor) -> FramebufferStatus;

    /// Creates a new command encoder.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Submits a finished command buffer for execution.
    fn submit_command_buffer(&self, command_buffer: CommandBufferId) -> Result<(), ResourceError>;
}
