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

//! Geometry lane: fills the G-buffer.

use super::scene_draws;
use crate::attachment::Attachment;
use crate::lane::{FrameContext, LaneStats, LanePipeline, PassLane};
use crate::sequencer::FramePass;
use bytemuck::{Pod, Zeroable};
use penumbra_core::math::LinearRgba;
use penumbra_core::renderer::constant::layout::LOCAL_BLOCK_SLOT;
use penumbra_core::renderer::{
    BlendMode, ColorTargetState, CommandEncoder, CompareFunction, CullMode, DepthState,
    GraphicsDevice, Operations, ProgramId, RenderError, RenderPassColorAttachment,
    RenderPassDepthAttachment, RenderPassDescriptor, RenderPipelineDescriptor, ShaderModuleId,
    TextureFormat,
};
use penumbra_core::scene::{Material, TextureSlot};
use std::any::Any;
use std::borrow::Cow;

const COLOR_ATTACHMENTS: [Attachment; 4] = [
    Attachment::Position,
    Attachment::Normal,
    Attachment::AlbedoSpecular,
    Attachment::DepthView,
];

/// Per-submesh material constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MaterialParams {
    albedo: [f32; 4],
    emissive: [f32; 4],
    smoothness: f32,
    far_plane: f32,
}

/// Writes position, normal, albedo/specular and view depth for every visible
/// surface.
///
/// The pre-pass depth is copied into the G-buffer depth first, and the pass
/// tests with `Equal` and no depth writes so that only the front-most
/// fragment of each pixel is shaded.
#[derive(Debug)]
pub struct GeometryLane {
    program: ProgramId,
    pipeline: LanePipeline,
    fallback_material: Material,
}

impl GeometryLane {
    /// Creates the lane drawing with `program`.
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            pipeline: LanePipeline::default(),
            fallback_material: Material::new("Default", LinearRgba::WHITE),
        }
    }
}

impl PassLane for GeometryLane {
    fn strategy_name(&self) -> &'static str {
        "Geometry"
    }

    fn pass(&self) -> FramePass {
        FramePass::GeometryPass
    }

    fn reads(&self) -> &[Attachment] {
        &[Attachment::PrePassDepth]
    }

    fn writes(&self) -> &[Attachment] {
        &[
            Attachment::GBufferDepth,
            Attachment::Position,
            Attachment::Normal,
            Attachment::AlbedoSpecular,
            Attachment::DepthView,
        ]
    }

    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError> {
        let shader = frame.program(self.program)?;
        let pipeline = self.pipeline.ensure(frame.device, shader, |shader| {
            let color_targets = COLOR_ATTACHMENTS
                .iter()
                .map(|a| ColorTargetState {
                    format: a.format(),
                    blend: BlendMode::Replace,
                })
                .collect::<Vec<_>>();
            RenderPipelineDescriptor {
                label: Some(Cow::Borrowed("Geometry")),
                shader,
                color_targets: Cow::Owned(color_targets),
                depth: Some(DepthState {
                    format: TextureFormat::Depth32Float,
                    compare: CompareFunction::Equal,
                    write_enabled: false,
                }),
                cull_mode: CullMode::Back,
            }
        })?;
        let buffer = frame.constant_buffer()?;

        encoder.copy_texture_to_texture(
            frame.targets.texture(Attachment::PrePassDepth),
            frame.targets.texture(Attachment::GBufferDepth),
            frame.viewport(),
        );

        let draws = scene_draws(frame.assets, frame.scene);
        let mut bindings = Vec::with_capacity(draws.len());
        for draw in &draws {
            bindings.push(frame.scene_binding(draw.mesh_index, draw.submesh_index, shader)?);
        }

        let color_attachments = COLOR_ATTACHMENTS.map(|a| RenderPassColorAttachment {
            view: frame.targets.view(a),
            ops: Operations::clear(LinearRgba::TRANSPARENT),
        });
        let far_plane = frame.scene.camera.z_far;
        let sampler = frame.samplers.linear_repeat;
        let assets = &*frame.assets;

        let mut stats = LaneStats::default();
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Geometry"),
            color_attachments: &color_attachments,
            depth_attachment: Some(RenderPassDepthAttachment {
                view: frame.targets.view(Attachment::GBufferDepth),
                depth_ops: Operations::load(),
            }),
        });
        pass.set_pipeline(pipeline);
        for (draw, binding) in draws.iter().zip(bindings) {
            let material = match draw.material_index {
                Some(index) => assets.materials.get(index).unwrap_or_else(|| {
                    log::warn!("Missing material {index}, using the default material");
                    &self.fallback_material
                }),
                None => &self.fallback_material,
            };

            for (slot, texture_slot) in TextureSlot::ALL.into_iter().enumerate() {
                let texture = assets.textures.resolve(material, texture_slot);
                pass.set_texture(slot as u32, texture.view, sampler);
            }
            let params = MaterialParams {
                albedo: material.albedo.to_vec4().to_array(),
                emissive: material.emissive.to_vec4().to_array(),
                smoothness: material.smoothness,
                far_plane,
            };
            pass.set_push_constants(0, bytemuck::bytes_of(&params));
            pass.set_constant_block(
                LOCAL_BLOCK_SLOT,
                buffer,
                draw.local_region.offset,
                draw.local_region.size,
            );
            pass.set_vertex_binding(binding);
            pass.draw_indexed(draw.first_index..draw.first_index + draw.index_count, 0, 0..1);
            stats.draw_calls += 1;
        }
        Ok(stats)
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
    fn test_material_params_layout() {
        assert_eq!(std::mem::size_of::<MaterialParams>(), 40);
        assert_eq!(std::mem::offset_of!(MaterialParams, smoothness), 32);
        assert_eq!(std::mem::offset_of!(MaterialParams, far_plane), 36);
    }
}
