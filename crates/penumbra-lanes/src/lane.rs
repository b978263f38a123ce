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

//! The lane abstraction and the per-frame state lanes record from.

use crate::attachment::Attachment;
use crate::primitives::{Primitive, Primitives};
use crate::sequencer::FramePass;
use crate::targets::FramebufferTargets;
use penumbra_core::math::Extent2D;
use penumbra_core::renderer::constant::ConstantRegion;
use penumbra_core::renderer::pipeline_cache::PipelineStateCache;
use penumbra_core::renderer::{
    BufferId, CommandEncoder, GraphicsDevice, ProgramId, RenderError, RenderPipelineDescriptor,
    RenderPipelineId, ResourceError, SamplerId, ShaderError, ShaderModuleId, ShaderProgramStore,
    VertexBindingId,
};
use penumbra_core::scene::{AssetTables, Scene};
use penumbra_core::RenderSettings;
use std::any::Any;

/// What a lane recorded during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneStats {
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Lights shaded.
    pub lights_drawn: u32,
}

/// Samplers shared by every lane.
#[derive(Debug, Clone, Copy)]
pub struct Samplers {
    /// Bilinear, repeating. Material textures and noise.
    pub linear_repeat: SamplerId,
    /// Nearest, clamped. G-buffer reads.
    pub nearest_clamp: SamplerId,
}

/// The constant regions written for this frame.
#[derive(Debug, Clone, Default)]
pub struct FrameConstants {
    /// The buffer every region lives in.
    pub buffer: Option<BufferId>,
    /// The global block.
    pub global: ConstantRegion,
    /// Local block of each light's volume, `None` for full-screen lights.
    pub light_volumes: Vec<Option<ConstantRegion>>,
}

/// Everything a lane may read or bind while recording.
pub struct FrameContext<'a> {
    /// The device.
    pub device: &'a dyn GraphicsDevice,
    /// The program store, to resolve current program modules.
    pub programs: &'a dyn ShaderProgramStore,
    /// The asset arenas.
    pub assets: &'a mut AssetTables,
    /// The scene, with this frame's local regions filled in.
    pub scene: &'a Scene,
    /// The render targets.
    pub targets: &'a FramebufferTargets,
    /// The binding cache.
    pub cache: &'a mut PipelineStateCache,
    /// Internal meshes.
    pub primitives: &'a mut Primitives,
    /// Shared samplers.
    pub samplers: Samplers,
    /// This frame's constant regions.
    pub constants: &'a FrameConstants,
    /// Renderer settings.
    pub settings: &'a RenderSettings,
}

impl FrameContext<'_> {
    /// The viewport size.
    pub fn viewport(&self) -> Extent2D {
        self.targets.size()
    }

    /// The current module of a program.
    pub fn program(&self, id: ProgramId) -> Result<ShaderModuleId, ShaderError> {
        self.programs
            .program(id)
            .ok_or(ShaderError::UnknownProgram { id })
    }

    /// The constant buffer, which exists once constants have been packed.
    pub fn constant_buffer(&self) -> Result<BufferId, RenderError> {
        self.constants
            .buffer
            .ok_or_else(|| RenderError::Internal("constants were not packed this frame".into()))
    }

    /// The binding of a scene submesh for `shader`.
    pub fn scene_binding(
        &mut self,
        mesh_index: usize,
        submesh_index: usize,
        shader: ShaderModuleId,
    ) -> Result<VertexBindingId, ResourceError> {
        let mesh = self
            .assets
            .meshes
            .get_mut(mesh_index)
            .ok_or(ResourceError::NotFound)?;
        self.cache
            .get_or_create_binding(self.device, mesh, submesh_index, shader)
    }

    /// The binding of an internal primitive for `shader`.
    pub fn primitive_binding(
        &mut self,
        primitive: Primitive,
        shader: ShaderModuleId,
    ) -> Result<VertexBindingId, ResourceError> {
        let mesh = self.primitives.mesh_mut(primitive);
        self.cache.get_or_create_binding(self.device, mesh, 0, shader)
    }

    /// The index count of an internal primitive.
    pub fn primitive_index_count(&self, primitive: Primitive) -> u32 {
        self.primitives
            .mesh(primitive)
            .submeshes
            .first()
            .map_or(0, |s| s.index_count)
    }
}

/// One stage of the frame.
///
/// A lane declares the attachments it reads and writes so the pipeline can
/// reject orderings where a lane samples a target nobody produced yet.
pub trait PassLane: Send + Sync + 'static {
    /// Human-readable name for logs.
    fn strategy_name(&self) -> &'static str;

    /// The frame pass this lane implements.
    fn pass(&self) -> FramePass;

    /// Attachments sampled by this lane.
    fn reads(&self) -> &[Attachment];

    /// Attachments rendered to by this lane.
    fn writes(&self) -> &[Attachment];

    /// Records the lane's commands.
    fn record(
        &mut self,
        frame: &mut FrameContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<LaneStats, RenderError>;

    /// Drops render pipelines built from `shader`, which a hot reload replaced.
    fn invalidate_shader(&mut self, device: &dyn GraphicsDevice, shader: ShaderModuleId);

    /// Destroys the lane's device objects.
    fn release(&mut self, device: &dyn GraphicsDevice);

    /// Returns a mutable reference to the underlying trait object as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A render pipeline memoized against the shader module it was built from.
#[derive(Debug, Default)]
pub struct LanePipeline {
    current: Option<(ShaderModuleId, RenderPipelineId)>,
}

impl LanePipeline {
    /// Returns the pipeline for `shader`, rebuilding it if the shader changed.
    pub fn ensure<'d>(
        &mut self,
        device: &dyn GraphicsDevice,
        shader: ShaderModuleId,
        describe: impl FnOnce(ShaderModuleId) -> RenderPipelineDescriptor<'d>,
    ) -> Result<RenderPipelineId, ResourceError> {
        match self.current {
            Some((built_for, pipeline)) if built_for == shader => Ok(pipeline),
            _ => {
                self.release(device);
                let pipeline = device.create_render_pipeline(&describe(shader))?;
                self.current = Some((shader, pipeline));
                Ok(pipeline)
            }
        }
    }

    /// Destroys the pipeline if it was built from `shader`.
    pub fn invalidate(&mut self, device: &dyn GraphicsDevice, shader: ShaderModuleId) {
        if matches!(self.current, Some((built_for, _)) if built_for == shader) {
            self.release(device);
        }
    }

    /// Destroys the pipeline.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Some((_, pipeline)) = self.current.take() {
            if let Err(e) = device.destroy_render_pipeline(pipeline) {
                log::warn!("Failed to destroy render pipeline {pipeline:?}: {e}");
            }
        }
    }

    /// The shader the pipeline was built from.
    pub fn shader(&self) -> Option<ShaderModuleId> {
        self.current.map(|(shader, _)| shader)
    }
}
