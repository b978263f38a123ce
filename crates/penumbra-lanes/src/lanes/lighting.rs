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

//! Lighting lane: accumulates every light into the final composite.

use crate::attachment::Attachment;
use crate::lane::{FrameContext, LaneStats, LanePipeline, PassLane};
use crate::primitives::Primitive;
use crate::sequencer::FramePass;
use bytemuck::{Pod, Zeroable};
use penumbra_core::renderer::constant::layout::{GLOBAL_BLOCK_SLOT, LOCAL_BLOCK_SLOT};
use penumbra_core::renderer::{
    BlendMode, ColorTargetState, CommandEncoder, CullMode, GraphicsDevice, Operations, ProgramId,
    RenderError, RenderPassColorAttachment, RenderPassDescriptor, RenderPipelineDescriptor,
    ShaderModuleId,
};
use std::any::Any;
use std::borrow::Cow;

const GBUFFER_INPUTS: [Attachment; 4] = [
    Attachment::Position,
    Attachment::Normal,
    Attachment::AlbedoSpecular,
    Attachment::BlurredAmbientOcclusion,
];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LightParams {
    light_index: u32,
    is_volume: u32,
    viewport: [f32; 2],
    attenuation: [f32; 3],
}

fn describe(
    shader: ShaderModuleId,
    label: &'static str,
    cull_mode: CullMode,
) -> RenderPipelineDescriptor<'static> {
    RenderPipelineDescriptor {
        label: Some(Cow::Borrowed(label)),
        shader,
        color_targets: Cow::Owned(vec![ColorTargetState {
            format: Attachment::FinalComposite.format(),
            blend: BlendMode::Additive,
        }]),
        depth: None,
        cull_mode,
    }
}

/// Draws one additive light volume per light.
///
/// Lights with a bounded influence draw their sphere with front faces culled,
/// so the volume still shades when the camera is inside it. Unbounded lights
/// draw the full-screen quad.
#[derive(Debug)]
pub struct LightingLane {
    program: ProgramId,
    full_screen: LanePipeline,
    volume: LanePipeline,
}

impl LightingLane {
    /// Creates the lane drawing with `program`.
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            full_screen: LanePipeline::default(),
            volume: LanePipeline::default(),
        }
    }
}

impl PassLane for LightingLane {
    fn strategy_name(&self) -> &'static str {
        "Lighting"
    }

    fn pass(&self) -> FramePass {
        FramePass::LightingPass
    }

    fn reads(&self) -> &[Attachment] {
        &GBUFFER_INPUTS
    }

    fn writes(&self) -> &[Attachment] {
        &[Attachment::FinalComposite]
    }

    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError> {
        let shader = frame.program(self.program)?;
        let full_screen = self.full_screen.ensure(frame.device, shader, |shader| {
            describe(shader, "Lighting (full-screen)", CullMode::None)
        })?;
        let volume = self.volume.ensure(frame.device, shader, |shader| {
            describe(shader, "Lighting (volume)", CullMode::Front)
        })?;
        let buffer = frame.constant_buffer()?;
        let quad = frame.primitive_binding(Primitive::FullScreenQuad, shader)?;
        let quad_indices = frame.primitive_index_count(Primitive::FullScreenQuad);
        let sphere = frame.primitive_binding(Primitive::UnitSphere, shader)?;
        let sphere_indices = frame.primitive_index_count(Primitive::UnitSphere);

        let viewport = frame.viewport();
        let attenuation = frame.settings.attenuation;
        let global = frame.constants.global;

        let color_attachments = [RenderPassColorAttachment {
            view: frame.targets.view(Attachment::FinalComposite),
            ops: Operations::clear(frame.scene.clear_color),
        }];
        let mut stats = LaneStats::default();
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Lighting"),
            color_attachments: &color_attachments,
            depth_attachment: None,
        });
        for (slot, attachment) in GBUFFER_INPUTS.into_iter().enumerate() {
            pass.set_texture(
                slot as u32,
                frame.targets.view(attachment),
                frame.samplers.nearest_clamp,
            );
        }
        pass.set_constant_block(GLOBAL_BLOCK_SLOT, buffer, global.offset, global.size);

        for index in 0..frame.scene.lights.len() {
            let region = frame.constants.light_volumes.get(index).copied().flatten();
            let params = LightParams {
                light_index: index as u32,
                is_volume: u32::from(region.is_some()),
                viewport: [viewport.width as f32, viewport.height as f32],
                attenuation: [attenuation.constant, attenuation.linear, attenuation.quadratic],
            };
            match region {
                Some(region) => {
                    pass.set_pipeline(volume);
                    pass.set_constant_block(LOCAL_BLOCK_SLOT, buffer, region.offset, region.size);
                    pass.set_push_constants(0, bytemuck::bytes_of(&params));
                    pass.set_vertex_binding(sphere);
                    pass.draw_indexed(0..sphere_indices, 0, 0..1);
                }
                None => {
                    pass.set_pipeline(full_screen);
                    pass.set_push_constants(0, bytemuck::bytes_of(&params));
                    pass.set_vertex_binding(quad);
                    pass.draw_indexed(0..quad_indices, 0, 0..1);
                }
            }
            stats.draw_calls += 1;
            stats.lights_drawn += 1;
        }
        log::trace!("Lighting: {} light(s)", stats.lights_drawn);
        Ok(stats)
    }

    fn invalidate_shader(&mut self, device: &dyn GraphicsDevice, shader: ShaderModuleId) {
        self.full_screen.invalidate(device, shader);
        self.volume.invalidate(device, shader);
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        self.full_screen.release(device);
        self.volume.release(device);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_params_layout() {
        assert_eq!(std::mem::size_of::<LightParams>(), 28);
        assert_eq!(std::mem::offset_of!(LightParams, viewport), 8);
        assert_eq!(std::mem::offset_of!(LightParams, attenuation), 16);
    }
}
