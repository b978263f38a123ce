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

//! Command recording for the headless device.

use super::device::HeadlessDevice;
use penumbra_core::math::Extent2D;
use penumbra_core::renderer::{
    BufferId, CommandBufferId, CommandEncoder, RenderPass, RenderPassColorAttachment,
    RenderPassDepthAttachment, RenderPassDescriptor, RenderPipelineId, SamplerId, TextureId,
    TextureViewId, VertexBindingId,
};
use std::any::Any;
use std::ops::Range;

/// One recorded command, executed at submission.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    BeginPass {
        label: Option<String>,
        color: Vec<RenderPassColorAttachment>,
        depth: Option<RenderPassDepthAttachment>,
    },
    SetPipeline(RenderPipelineId),
    SetVertexBinding(VertexBindingId),
    SetConstantBlock {
        slot: u32,
        buffer: BufferId,
        offset: u64,
        size: u64,
    },
    SetTexture {
        slot: u32,
        view: TextureViewId,
        sampler: SamplerId,
    },
    SetPushConstants {
        offset: u32,
        len: usize,
    },
    Draw {
        vertices: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
    },
    EndPass,
    CopyTexture {
        source: TextureId,
        destination: TextureId,
        size: Extent2D,
    },
}

/// Records commands into memory until [`CommandEncoder::finish`].
pub struct HeadlessCommandEncoder {
    pub(crate) device: HeadlessDevice,
    pub(crate) label: Option<String>,
    pub(crate) commands: Vec<Command>,
}

/// A render pass recording into its encoder. Ends the pass when dropped.
pub struct HeadlessRenderPass<'a> {
    commands: &'a mut Vec<Command>,
}

impl RenderPass for HeadlessRenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: RenderPipelineId) {
        self.commands.push(Command::SetPipeline(pipeline));
    }

    fn set_vertex_binding(&mut self, binding: VertexBindingId) {
        self.commands.push(Command::SetVertexBinding(binding));
    }

    fn set_constant_block(&mut self, slot: u32, buffer: BufferId, offset: u64, size: u64) {
        self.commands.push(Command::SetConstantBlock {
            slot,
            buffer,
            offset,
            size,
        });
    }

    fn set_texture(&mut self, slot: u32, view: TextureViewId, sampler: SamplerId) {
        self.commands
            .push(Command::SetTexture { slot, view, sampler });
    }

    fn set_push_constants(&mut self, offset: u32, data: &[u8]) {
        self.commands.push(Command::SetPushConstants {
            offset,
            len: data.len(),
        });
    }

    fn draw(&mut self, vertices: Range<u32>, _instances: Range<u32>) {
        self.commands.push(Command::Draw { vertices });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {
        self.commands.push(Command::DrawIndexed { indices });
    }
}

impl Drop for HeadlessRenderPass<'_> {
    fn drop(&mut self) {
        self.commands.push(Command::EndPass);
    }
}

impl CommandEncoder for HeadlessCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass + 'encoder> {
        self.commands.push(Command::BeginPass {
            label: descriptor.label.map(str::to_string),
            color: descriptor.color_attachments.to_vec(),
            depth: descriptor.depth_attachment,
        });
        Box::new(HeadlessRenderPass {
            commands: &mut self.commands,
        })
    }

    fn copy_texture_to_texture(&mut self, source: TextureId, destination: TextureId, size: Extent2D) {
        self.commands.push(Command::CopyTexture {
            source,
            destination,
            size,
        });
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let encoder = *self;
        encoder
            .device
            .register_command_buffer(encoder.label, encoder.commands)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
