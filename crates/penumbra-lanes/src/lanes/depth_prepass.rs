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

//! Depth pre-pass lane.
//!
//! Fills the pre-pass depth with the nearest surface of every entity so the
//! geometry pass shades each pixel exactly once.

use super::scene_draws;
use crate::attachment::Attachment;
use crate::lane::{FrameContext, LaneStats, LanePipeline, PassLane};
use crate::sequencer::FramePass;
use penumbra_core::renderer::constant::layout::LOCAL_BLOCK_SLOT;
use penumbra_core::renderer::{
    CommandEncoder, CompareFunction, CullMode, DepthState, GraphicsDevice, Operations, ProgramId,
    RenderError, RenderPassDepthAttachment, RenderPassDescriptor, RenderPipelineDescriptor,
    ShaderModuleId, TextureFormat,
};
use std::any::Any;
use std::borrow::Cow;

/// Depth-only rendering of every entity with `Less` compare.
#[derive(Debug)]
pub struct DepthPrePassLane {
    program: ProgramId,
    pipeline: LanePipeline,
}

impl DepthPrePassLane {
    /// Creates the lane drawing with `program`.
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            pipeline: LanePipeline::default(),
        }
    }
}

impl PassLane for DepthPrePassLane {
    fn strategy_name(&self) -> &'static str {
        "DepthPrePass"
    }

    fn pass(&self) -> FramePass {
        FramePass::DepthPrePass
    }

    fn reads(&self) -> &[Attachment] {
        &[]
    }

    fn writes(&self) -> &[Attachment] {
        &[Attachment::PrePassDepth]
    }

    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError> {
        let shader = frame.program(self.program)?;
        let pipeline = self.pipeline.ensure(frame.device, shader, |shader| {
            RenderPipelineDescriptor {
                label: Some(Cow::Borrowed("Depth Pre-pass")),
                shader,
                color_targets: Cow::Borrowed(&[]),
                depth: Some(DepthState {
                    format: TextureFormat::Depth32Float,
                    compare: CompareFunction::Less,
                    write_enabled: true,
                }),
                cull_mode: CullMode::Back,
            }
        })?;
        let buffer = frame.constant_buffer()?;

        let draws = scene_draws(frame.assets, frame.scene);
        let mut bindings = Vec::with_capacity(draws.len());
        for draw in &draws {
            bindings.push(frame.scene_binding(draw.mesh_index, draw.submesh_index, shader)?);
        }

        let mut stats = LaneStats::default();
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Depth Pre-pass"),
            color_attachments: &[],
            depth_attachment: Some(RenderPassDepthAttachment {
                view: frame.targets.view(Attachment::PrePassDepth),
                depth_ops: Operations::clear(1.0),
            }),
        });
        pass.set_pipeline(pipeline);
        for (draw, binding) in draws.iter().zip(bindings) {
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
        log::trace!("Depth pre-pass: {} draw(s)", stats.draw_calls);
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
