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

//! Screen-space ambient occlusion lane.

use crate::attachment::Attachment;
use crate::kernel::SsaoKernel;
use crate::lane::{FrameContext, LaneStats, LanePipeline, PassLane};
use crate::primitives::Primitive;
use crate::sequencer::FramePass;
use bytemuck::{Pod, Zeroable};
use penumbra_core::math::{Extent2D, LinearRgba};
use penumbra_core::renderer::{
    BlendMode, BufferDescriptor, BufferId, BufferUsage, ColorTargetState, CommandEncoder,
    CullMode, GraphicsDevice, Operations, ProgramId, RenderError, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipelineDescriptor, ResourceError, ShaderModuleId,
    TextureDescriptor, TextureFormat, TextureId, TextureUsage, TextureViewDescriptor,
    TextureViewId,
};
use penumbra_core::SsaoSettings;
use std::any::Any;
use std::borrow::Cow;

/// Constant slot of the sample kernel.
pub const KERNEL_BLOCK_SLOT: u32 = 2;

/// Samples the occlusion shader loops over.
const SHADER_KERNEL_SIZE: usize = 64;

const POSITION_SLOT: u32 = 0;
const NORMAL_SLOT: u32 = 1;
const NOISE_SLOT: u32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SsaoParams {
    view_projection: [f32; 16],
    noise_scale: [f32; 2],
    radius: f32,
    bias: f32,
}

/// Estimates ambient occlusion from G-buffer positions and normals.
#[derive(Debug)]
pub struct SsaoLane {
    program: ProgramId,
    pipeline: LanePipeline,
    kernel_buffer: Option<BufferId>,
    kernel_size: u64,
    noise_texture: Option<(TextureId, TextureViewId)>,
    noise_dimension: u32,
    radius: f32,
    bias: f32,
}

impl SsaoLane {
    /// Generates the kernel and noise from `settings` and uploads them.
    pub fn new(
        device: &dyn GraphicsDevice,
        program: ProgramId,
        settings: &SsaoSettings,
    ) -> Result<Self, ResourceError> {
        let kernel = SsaoKernel::generate(settings);

        let mut samples = kernel.sample_bytes();
        let shader_bytes = SHADER_KERNEL_SIZE * 16;
        if samples.len() < shader_bytes {
            samples.resize(shader_bytes, 0);
        }
        let mut lane = Self {
            program,
            pipeline: LanePipeline::default(),
            kernel_buffer: None,
            kernel_size: samples.len() as u64,
            noise_texture: None,
            noise_dimension: kernel.noise_dimension,
            radius: settings.radius,
            bias: settings.bias,
        };
        if let Err(e) = lane.upload(device, &kernel, &samples) {
            lane.release(device);
            return Err(e);
        }

        log::debug!(
            "SSAO kernel: {} samples, {}x{} noise",
            kernel.samples.len(),
            kernel.noise_dimension,
            kernel.noise_dimension
        );
        Ok(lane)
    }

    fn upload(
        &mut self,
        device: &dyn GraphicsDevice,
        kernel: &SsaoKernel,
        samples: &[u8],
    ) -> Result<(), ResourceError> {
        self.kernel_buffer = Some(device.create_buffer_with_data(
            &BufferDescriptor {
                label: Some(Cow::Borrowed("SSAO Kernel")),
                size: samples.len() as u64,
                usage: BufferUsage::UNIFORM,
            },
            samples,
        )?);

        let noise_size = Extent2D::new(kernel.noise_dimension, kernel.noise_dimension);
        let noise = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("SSAO Noise")),
            size: noise_size,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;
        let view = device.write_texture(noise, &kernel.noise_rgba8()).and_then(|()| {
            device.create_texture_view(
                noise,
                &TextureViewDescriptor {
                    label: Some(Cow::Borrowed("SSAO Noise View")),
                },
            )
        });
        match view {
            Ok(view) => {
                self.noise_texture = Some((noise, view));
                Ok(())
            }
            Err(e) => {
                if let Err(destroy) = device.destroy_texture(noise) {
                    log::warn!("Failed to destroy SSAO noise texture: {destroy}");
                }
                Err(e)
            }
        }
    }
}

impl PassLane for SsaoLane {
    fn strategy_name(&self) -> &'static str {
        "SSAO"
    }

    fn pass(&self) -> FramePass {
        FramePass::AoPass
    }

    fn reads(&self) -> &[Attachment] {
        &[Attachment::Position, Attachment::Normal]
    }

    fn writes(&self) -> &[Attachment] {
        &[Attachment::AmbientOcclusion]
    }

    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError> {
        let (Some(kernel_buffer), Some((_, noise_view))) = (self.kernel_buffer, self.noise_texture)
        else {
            return Err(RenderError::Internal("SSAO lane used after release".into()));
        };
        let shader = frame.program(self.program)?;
        let pipeline = self.pipeline.ensure(frame.device, shader, |shader| {
            RenderPipelineDescriptor {
                label: Some(Cow::Borrowed("SSAO")),
                shader,
                color_targets: Cow::Owned(vec![ColorTargetState {
                    format: Attachment::AmbientOcclusion.format(),
                    blend: BlendMode::Replace,
                }]),
                depth: None,
                cull_mode: CullMode::None,
            }
        })?;
        let quad = frame.primitive_binding(Primitive::FullScreenQuad, shader)?;
        let quad_indices = frame.primitive_index_count(Primitive::FullScreenQuad);

        let viewport = frame.viewport();
        let noise = self.noise_dimension as f32;
        let params = SsaoParams {
            view_projection: frame.scene.camera.view_projection(viewport).to_cols_array(),
            noise_scale: [viewport.width as f32 / noise, viewport.height as f32 / noise],
            radius: self.radius,
            bias: self.bias,
        };

        let color_attachments = [RenderPassColorAttachment {
            view: frame.targets.view(Attachment::AmbientOcclusion),
            ops: Operations::clear(LinearRgba::WHITE),
        }];
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("SSAO"),
            color_attachments: &color_attachments,
            depth_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_texture(
            POSITION_SLOT,
            frame.targets.view(Attachment::Position),
            frame.samplers.nearest_clamp,
        );
        pass.set_texture(
            NORMAL_SLOT,
            frame.targets.view(Attachment::Normal),
            frame.samplers.nearest_clamp,
        );
        pass.set_texture(NOISE_SLOT, noise_view, frame.samplers.linear_repeat);
        pass.set_constant_block(KERNEL_BLOCK_SLOT, kernel_buffer, 0, self.kernel_size);
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
        if let Some(buffer) = self.kernel_buffer.take() {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("Failed to destroy SSAO kernel buffer: {e}");
            }
        }
        if let Some((texture, view)) = self.noise_texture.take() {
            if let Err(e) = device.destroy_texture_view(view) {
                log::warn!("Failed to destroy SSAO noise view: {e}");
            }
            if let Err(e) = device.destroy_texture(texture) {
                log::warn!("Failed to destroy SSAO noise texture: {e}");
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<SsaoParams>(), 80);
        assert_eq!(std::mem::offset_of!(SsaoParams, noise_scale), 64);
        assert_eq!(std::mem::offset_of!(SsaoParams, radius), 72);
        assert_eq!(std::mem::offset_of!(SsaoParams, bias), 76);
    }
}
