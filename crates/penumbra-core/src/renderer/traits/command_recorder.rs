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

use crate::math::Extent2D;
use crate::renderer::api::*;
use std::any::Any;
use std::ops::Range;

/// A trait representing an active render pass, used for recording drawing commands.
///
/// A `RenderPass` is obtained from a [`CommandEncoder`] and borrows it mutably,
/// so only one pass can be recorded at a time. Dropping the pass ends it.
pub trait RenderPass {
    /// Sets the active render pipeline for subsequent draw calls.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds the vertex and index buffers of a vertex binding.
    fn set_vertex_binding(&mut self, binding: VertexBindingId);

    /// Binds `size` bytes of `buffer` starting at `offset` to a constant block slot.
    fn set_constant_block(&mut self, slot: u32, buffer: BufferId, offset: u64, size: u64);

    /// Binds a texture view and sampler to a texture slot.
    fn set_texture(&mut self, slot: u32, view: TextureViewId, sampler: SamplerId);

    /// Sets push-constant data visible to subsequent draws.
    fn set_push_constants(&mut self, offset: u32, data: &[u8]);

    /// Records a non-indexed draw call.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw call.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}

/// A trait for an object that records a sequence of GPU commands.
///
/// The encoder creates render passes and records commands outside of a pass,
/// such as texture copies. It is consumed by [`finish`](CommandEncoder::finish).
pub trait CommandEncoder {
    /// Begins a new render pass.
    ///
    /// The returned pass borrows the encoder mutably. When it is dropped the
    /// pass is ended.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder>;

    /// Records a copy of the top-left `size` texels from one texture to another
    /// of the same format.
    fn copy_texture_to_texture(&mut self, source: TextureId, destination: TextureId, size: Extent2D);

    /// Finalizes the command recording and returns a handle to the command buffer.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Returns a mutable reference to the underlying trait object as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
