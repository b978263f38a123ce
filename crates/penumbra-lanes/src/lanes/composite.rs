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

//! Composite lane: presents the selected attachment on the surface.

use crate::attachment::Attachment;
use crate::lane::{FrameContext, LaneStats, LanePipeline, PassLane};
use crate::primitives::Primitive;
use crate::sequencer::FramePass;
use penumbra_core::math::LinearRgba;
use penumbra_core::renderer::{
    BlendMode, ColorTargetState, CommandEncoder, CullMode, GraphicsDevice, Operations, ProgramId,
    RenderError, RenderPassColorAttachment, RenderPassDescriptor, RenderPipelineDescriptor,
    ShaderModuleId,
};
use penumbra_core::DisplayAttachment;
use std::any::Any;
use std::borrow::Cow;

/// Copies one attachment to the surface. Single-channel attachments are
/// expanded to grey.
#[derive(Debug)]
pub struct CompositeLane {
    program: ProgramId,
    pipeline: LanePipeline,
    display: [Attachment; 1],
}

impl CompositeLane {
    /// Creates the lane presenting `display`.
    pub fn new(program: ProgramId, display: DisplayAttachment) -> Self {
        Self {
            program,
            pipeline: LanePipeline::default(),
            display: [display.into()],
        }
    }

    /// The attachment currently presented.
    pub fn display(&self) -> Attachment {
        self.display[0]
    }

    /// Selects the attachment to present from the next frame on.
    pub fn set_display(&mut self, display: DisplayAttachment) {
        self.display = [display.into()];
    }
}

impl PassLane for CompositeLane {
    fn strategy_name(&self) -> &'static str {
        "Composite"
    }

    fn pass(&self) -> FramePass {
        FramePass::CompositePass
    }

    fn reads(&self) -> &[Attachment] {
        &self.display
    }

    fn writes(&self) -> &[Attachment] {
        &[Attachment::Surface]
    }

    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError> {
        let shader = frame.program(self.program)?;
        let pipeline = self.pipeline.ensure(frame.device, shader, |shader| {
            RenderPipelineDescriptor {
                label: Some(Cow::Borrowed("Composite")),
                shader,
                color_targets: Cow::Owned(vec![ColorTargetState {
                    format: Attachment::Surface.format(),
                    blend: BlendMode::Replace,
                }]),
                depth: None,
                cull_mode: CullMode::None,
            }
        })?;
        let quad = frame.primitive_binding(Primitive::FullScreenQuad, shader)?;
        let quad_indices = frame.primitive_index_count(Primitive::FullScreenQuad);

        let display = self.display();
        let single_channel = u32::from(display.format().channel_count() == 1);

        let color_attachments = [RenderPassColorAttachment {
            view: frame.targets.view(Attachment::Surface),
            ops: Operations::clear(LinearRgba::BLACK),
        }];
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Composite"),
            color_attachments: &color_attachments,
            depth_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_texture(0, frame.targets.view(display), frame.samplers.nearest_clamp);
        pass.set_push_constants(0, bytemuck::bytes_of(&single_channel));
        pass.set_vertex_binding(quad);
        pass.draw_indexed(0..quad_indices, 0, 0..1);

        Ok(LaneStats {
            draw_calls: 1,
            lights_drawn: 0,
        })
    }

    fn invalidate_shader(&mut self, device: &dyn GraphicsDevice, shader: ShaderModuleId) {
        self.pipeline.invalidate(device, shader);
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        self.pipeline.release(device);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_selection_changes_reads() {
        let mut lane = CompositeLane::new(ProgramId(0), DisplayAttachment::FinalComposite);
        assert_eq!(lane.reads(), &[Attachment::FinalComposite]);

        lane.set_display(DisplayAttachment::AmbientOcclusion);
        assert_eq!(lane.reads(), &[Attachment::AmbientOcclusion]);
        assert_eq!(lane.writes(), &[Attachment::Surface]);
    }
}
