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

//! Box blur of the ambient occlusion.

use crate::attachment::Attachment;
use crate::lane::{FrameContext, LaneStats, LanePipeline, PassLane};
use crate::primitives::Primitive;
use crate::sequencer::FramePass;
use bytemuck::{Pod, Zeroable};
use penumbra_core::math::LinearRgba;
use penumbra_core::renderer::{
    BlendMode, ColorTargetState, CommandEncoder, CullMode, GraphicsDevice, Operations, ProgramId,
    RenderError, RenderPassColorAttachment, RenderPassDescriptor, RenderPipelineDescriptor,
    ShaderModuleId,
};
use std::any::Any;
use std::borrow::Cow;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BlurParams {
    texel_size: [f32; 2],
    half_extent: i32,
}

/// Averages the occlusion over a square matching the noise tile, which
/// removes the rotation pattern.
#[derive(Debug)]
pub struct SsaoBlurLane {
    program: ProgramId,
    pipeline: LanePipeline,
    half_extent: i32,
}

impl SsaoBlurLane {
    /// Creates the lane. `noise_dimension` is the side of the SSAO noise tile.
    pub fn new(program: ProgramId, noise_dimension: u32) -> Self {
        Self {
            program,
            pipeline: LanePipeline::default(),
            half_extent: (noise_dimension / 2).max(1) as i32,
        }
    }
}

impl PassLane for SsaoBlurLane {
    fn strategy_name(&self) -> &'static str {
        "SSAO Blur"
    }

    fn pass(&self) -> FramePass {
        FramePass::AoBlurPass
    }

    fn reads(&self) -> &[Attachment] {
        &[Attachment::AmbientOcclusion]
    }

    fn writes(&self) -> &[Attachment] {
        &[Attachment::BlurredAmbientOcclusion]
    }

    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError> {
        let shader = frame.program(self.program)?;
        let pipeline = self.pipeline.ensure(frame.device, shader, |shader| {
            RenderPipelineDescriptor {
                label: Some(Cow::Borrowed("SSAO Blur")),
                shader,
                color_targets: Cow::Owned(vec![ColorTargetState {
                    format: Attachment::BlurredAmbientOcclusion.format(),
                    blend: BlendMode::Replace,
                }]),
                depth: None,
                cull_mode: CullMode::None,
            }
        })?;
        let quad = frame.primitive_binding(Primitive::FullScreenQuad, shader)?;
        let quad_indices = frame.primitive_index_count(Primitive::FullScreenQuad);

        let viewport = frame.viewport();
        let params = BlurParams {
            texel_size: [1.0 / viewport.width as f32, 1.0 / viewport.height as f32],
            half_extent: self.half_extent,
        };

        let color_attachments = [RenderPassColorAttachment {
            view: frame.targets.view(Attachment::BlurredAmbientOcclusion),
            ops: Operations::clear(LinearRgba::WHITE),
        }];
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("SSAO Blur"),
            color_attachments: &color_attachments,
            depth_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_texture(
            0,
            frame.targets.view(Attachment::AmbientOcclusion),
            frame.samplers.nearest_clamp,
        );
        pass.set_push_constants(0, bytemuck::bytes_of(&params));
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
    fn test_half_extent_follows_noise_tile() {
        let program = ProgramId(0);
        assert_eq!(SsaoBlurLane::new(program, 4).half_extent, 2);
        assert_eq!(SsaoBlurLane::new(program, 1).half_extent, 1);
        assert_eq!(std::mem::size_of::<BlurParams>(), 12);
    }
}
