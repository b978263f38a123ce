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

//! The frame pipeline: sequences the six lanes over shared frame state.

use crate::attachment::Attachment;
use crate::context::RenderContext;
use crate::error::PipelineSetupError;
use crate::lane::{FrameConstants, FrameContext, PassLane, Samplers};
use crate::lanes::{
    CompositeLane, DepthPrePassLane, GeometryLane, LightingLane, SsaoBlurLane, SsaoLane,
};
use crate::primitives::Primitives;
use crate::sequencer::{FramePass, PassSequencer};
use crate::shaders::BuiltinProgram;
use crate::targets::FramebufferTargets;
use ahash::AHashSet;
use penumbra_core::math::Extent2D;
use penumbra_core::renderer::constant::layout::{pack_global_block, pack_local_block};
use penumbra_core::renderer::constant::ConstantRegionAllocator;
use penumbra_core::renderer::light_volume::LightVolumeCuller;
use penumbra_core::renderer::pipeline_cache::{CacheStats, PipelineStateCache};
use penumbra_core::renderer::{
    AddressMode, FilterMode, GraphicsDevice, ProgramId, ProgramReload, RenderError,
    ResourceError, SamplerDescriptor, SamplerId, ShaderModuleId, ShaderProgramStore,
};
use penumbra_core::scene::{AssetTables, Scene};
use penumbra_core::{DisplayAttachment, RenderSettings};
use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;

/// What one call to [`FramePipeline::render_frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// Passes recorded, in order.
    pub passes: Vec<FramePass>,
    /// Draw calls over all passes.
    pub draw_calls: u32,
    /// Lights shaded by the lighting pass.
    pub lights_drawn: u32,
    /// Vertex bindings created this frame.
    pub bindings_created: u64,
    /// Vertex bindings destroyed by hot reloads this frame.
    pub bindings_invalidated: u64,
    /// Programs swapped by hot reload before recording.
    pub programs_reloaded: usize,
    /// Whether the targets were recreated for a new viewport size.
    pub targets_recreated: bool,
    /// Bytes of constant data flushed.
    pub constant_bytes: u64,
    /// CPU time spent polling reloads, resizing and packing constants.
    pub cpu_preparation_time_ms: f32,
    /// CPU time spent recording and submitting.
    pub cpu_render_submission_time_ms: f32,
}

/// The program of each lane.
#[derive(Debug, Clone, Copy)]
struct LanePrograms {
    depth_prepass: ProgramId,
    geometry: ProgramId,
    ssao: ProgramId,
    ssao_blur: ProgramId,
    lighting: ProgramId,
    composite: ProgramId,
}

impl LanePrograms {
    fn register(
        device: &dyn GraphicsDevice,
        programs: &mut dyn ShaderProgramStore,
        shader_dir: Option<&Path>,
    ) -> Result<Self, PipelineSetupError> {
        let mut register = |program: BuiltinProgram| {
            programs.register(device, program.name(), program.source(shader_dir))
        };
        Ok(Self {
            depth_prepass: register(BuiltinProgram::DepthPrePass)?,
            geometry: register(BuiltinProgram::Geometry)?,
            ssao: register(BuiltinProgram::Ssao)?,
            ssao_blur: register(BuiltinProgram::SsaoBlur)?,
            lighting: register(BuiltinProgram::Lighting)?,
            composite: register(BuiltinProgram::Composite)?,
        })
    }
}

/// Checks that the lanes run the frame passes in order and that every
/// attachment a lane reads is written by a strictly earlier lane.
pub fn validate_lane_order(lanes: &[Box<dyn PassLane>]) -> Result<(), PipelineSetupError> {
    let mut written: AHashSet<Attachment> = AHashSet::new();
    for (position, lane) in lanes.iter().enumerate() {
        let expected = FramePass::ALL.get(position).copied();
        if expected != Some(lane.pass()) {
            return Err(PipelineSetupError::LaneOutOfOrder {
                lane: lane.strategy_name(),
                expected,
                found: lane.pass(),
            });
        }
        if let Some(&attachment) = lane.reads().iter().find(|a| !written.contains(*a)) {
            return Err(PipelineSetupError::UnwrittenAttachment {
                lane: lane.strategy_name(),
                attachment,
            });
        }
        written.extend(lane.writes().iter().copied());
    }
    match FramePass::ALL.get(lanes.len()) {
        Some(&missing) => Err(PipelineSetupError::MissingPass { missing }),
        None => Ok(()),
    }
}

/// Owns every per-renderer resource and records one frame at a time.
pub struct FramePipeline {
    lanes: Vec<Box<dyn PassLane>>,
    sequencer: PassSequencer,
    allocator: ConstantRegionAllocator,
    cache: PipelineStateCache,
    targets: FramebufferTargets,
    primitives: Primitives,
    samplers: Samplers,
    culler: LightVolumeCuller,
    constants: FrameConstants,
    settings: RenderSettings,
    frame_number: u64,
}

impl FramePipeline {
    /// Builds the six lanes and every resource they share.
    ///
    /// Built-in programs are registered with `programs`, read from
    /// `<shader_dir>/<name>.glsl` when present so they can be hot reloaded.
    ///
    /// ## Errors
    /// * `PipelineSetupError::Shader` - If a built-in program fails to compile.
    /// * `PipelineSetupError::Render` - If a framebuffer is incomplete or a
    ///   device object cannot be created.
    pub fn new(
        ctx: &RenderContext,
        programs: &mut dyn ShaderProgramStore,
        settings: RenderSettings,
        shader_dir: Option<&Path>,
    ) -> Result<Self, PipelineSetupError> {
        let device = ctx.device.as_ref();
        let limits = device.limits();
        log::info!("Using adapter: {}", device.adapter_info());
        log::info!(
            "Device limits: max constant block {} B, constant offset alignment {} B, max texture {}",
            limits.max_constant_block_size,
            limits.min_constant_offset_alignment,
            limits.max_texture_dimension_2d
        );

        let ids = LanePrograms::register(device, programs, shader_dir)?;
        let mut lanes: Vec<Box<dyn PassLane>> = vec![
            Box::new(DepthPrePassLane::new(ids.depth_prepass)),
            Box::new(GeometryLane::new(ids.geometry)),
            Box::new(SsaoLane::new(device, ids.ssao, &settings.ssao).map_err(RenderError::from)?),
            Box::new(SsaoBlurLane::new(ids.ssao_blur, settings.ssao.noise_dimension)),
            Box::new(LightingLane::new(ids.lighting)),
            Box::new(CompositeLane::new(ids.composite, settings.display)),
        ];
        let shared = validate_lane_order(&lanes)
            .and_then(|()| SharedResources::create(device, &settings, ctx.viewport));
        let SharedResources {
            allocator,
            targets,
            primitives,
            samplers,
        } = match shared {
            Ok(shared) => shared,
            Err(e) => {
                for lane in &mut lanes {
                    lane.release(device);
                }
                return Err(e);
            }
        };
        let culler = settings.light_volume_culler();

        log::info!(
            "Frame pipeline ready: {} lanes, {}x{} targets",
            lanes.len(),
            targets.size().width,
            targets.size().height
        );

        Ok(Self {
            lanes,
            sequencer: PassSequencer::new(),
            allocator,
            cache: PipelineStateCache::new(),
            targets,
            primitives,
            samplers,
            culler,
            constants: FrameConstants::default(),
            settings,
            frame_number: 0,
        })
    }

    /// Renders one frame of `ctx.scene`.
    ///
    /// Reloaded programs have their bindings and render pipelines dropped
    /// before any pass records, and the targets follow `ctx.viewport`.
    pub fn render_frame(
        &mut self,
        ctx: &mut RenderContext,
        programs: &mut dyn ShaderProgramStore,
    ) -> Result<FrameReport, RenderError> {
        let preparation_start = Instant::now();
        let device = ctx.device.as_ref();
        let stats_before = self.cache.stats();

        let reloads = programs.poll_reloads(device);
        for reload in &reloads {
            self.apply_reload(device, &mut ctx.assets, reload);
        }
        let invalidated = self.cache.stats().evictions - stats_before.evictions;

        let targets_recreated = self.targets.resize(device, ctx.viewport)?;

        let constant_bytes = match self.pack_constants(device, &mut ctx.scene) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.allocator.discard_frame();
                return Err(e);
            }
        };
        let preparation = preparation_start.elapsed();

        let submission_start = Instant::now();
        let mut report = FrameReport {
            frame_number: self.frame_number,
            bindings_invalidated: invalidated,
            programs_reloaded: reloads.len(),
            targets_recreated,
            constant_bytes,
            ..FrameReport::default()
        };

        let mut encoder = device.create_command_encoder(Some("Frame"));
        let mut frame = FrameContext {
            device,
            programs: &*programs,
            assets: &mut ctx.assets,
            scene: &ctx.scene,
            targets: &self.targets,
            cache: &mut self.cache,
            primitives: &mut self.primitives,
            samplers: self.samplers,
            constants: &self.constants,
            settings: &self.settings,
        };
        self.sequencer.begin_frame();
        for lane in &mut self.lanes {
            self.sequencer.enter(lane.pass())?;
            let stats = lane.record(&mut frame, encoder.as_mut()).map_err(|e| {
                log::error!("{} lane failed: {e}", lane.strategy_name());
                e
            })?;
            log::trace!("{}: {stats:?}", lane.strategy_name());
            report.passes.push(lane.pass());
            report.draw_calls += stats.draw_calls;
            report.lights_drawn += stats.lights_drawn;
        }
        self.sequencer.finish()?;

        device.submit_command_buffer(encoder.finish())?;

        report.bindings_created = self.cache.stats().creations - stats_before.creations;
        report.cpu_preparation_time_ms = preparation.as_secs_f32() * 1000.0;
        report.cpu_render_submission_time_ms = submission_start.elapsed().as_secs_f32() * 1000.0;
        self.frame_number += 1;
        Ok(report)
    }

    fn apply_reload(
        &mut self,
        device: &dyn GraphicsDevice,
        assets: &mut AssetTables,
        reload: &ProgramReload,
    ) {
        log::info!(
            "Program {:?} reloaded: {:?} -> {:?}",
            reload.program,
            reload.old,
            reload.new
        );
        self.invalidate_shader(device, assets, reload.old);
    }

    fn invalidate_shader(
        &mut self,
        device: &dyn GraphicsDevice,
        assets: &mut AssetTables,
        shader: ShaderModuleId,
    ) {
        let meshes = assets.meshes.iter_mut().chain(self.primitives.meshes_mut());
        self.cache.invalidate_shader(device, meshes, shader);
        for lane in &mut self.lanes {
            lane.invalidate_shader(device, shader);
        }
    }

    /// Packs the global block, one local block per entity and one per
    /// bounded light volume, then flushes them.
    fn pack_constants(
        &mut self,
        device: &dyn GraphicsDevice,
        scene: &mut Scene,
    ) -> Result<u64, RenderError> {
        let view_projection = scene.camera.view_projection(self.targets.size());

        self.allocator.begin_frame()?;
        let global = pack_global_block(&mut self.allocator, scene.camera.position, &scene.lights)?;

        for entity in &mut scene.entities {
            entity.local_region = Some(pack_local_block(
                &mut self.allocator,
                &entity.world_matrix,
                &view_projection,
            )?);
        }

        let mut light_volumes = Vec::with_capacity(scene.lights.len());
        for light in &scene.lights {
            let region = match self.culler.volume(light).world_matrix() {
                Some(world) => Some(pack_local_block(&mut self.allocator, &world, &view_projection)?),
                None => None,
            };
            light_volumes.push(region);
        }

        let bytes = self.allocator.end_frame(device)?;
        self.constants = FrameConstants {
            buffer: Some(self.allocator.buffer()),
            global,
            light_volumes,
        };
        log::trace!("Packed {bytes} constant bytes for {} entities", scene.entities.len());
        Ok(bytes)
    }

    /// Selects the attachment the composite pass presents.
    pub fn set_display(&mut self, display: DisplayAttachment) {
        for lane in &mut self.lanes {
            if let Some(composite) = lane.as_any_mut().downcast_mut::<CompositeLane>() {
                composite.set_display(display);
                log::debug!("Displaying {:?}", composite.display());
            }
        }
        self.settings.display = display;
    }

    /// The render targets.
    pub fn targets(&self) -> &FramebufferTargets {
        &self.targets
    }

    /// The settings the pipeline was built with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Binding cache counters since creation.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Capacity of the per-frame constant buffer.
    pub fn constant_capacity(&self) -> u64 {
        self.allocator.capacity()
    }

    /// The lanes in execution order.
    pub fn lanes(&self) -> impl Iterator<Item = &dyn PassLane> {
        self.lanes.iter().map(|lane| lane.as_ref())
    }

    /// Releases every binding of the scene meshes and destroys the
    /// pipeline's own device objects.
    pub fn destroy(mut self, ctx: &mut RenderContext) {
        let device = ctx.device.as_ref();
        for mesh in ctx.assets.meshes.iter_mut().chain(self.primitives.meshes_mut()) {
            self.cache.release_mesh(device, mesh);
        }
        for lane in &mut self.lanes {
            lane.release(device);
        }
        for entity in &mut ctx.scene.entities {
            entity.local_region = None;
        }
        for sampler in [self.samplers.linear_repeat, self.samplers.nearest_clamp] {
            if let Err(e) = device.destroy_sampler(sampler) {
                log::warn!("Failed to destroy sampler {sampler:?}: {e}");
            }
        }
        self.primitives.destroy(device);
        self.targets.destroy(device);
        self.allocator.destroy(device);
    }
}

/// The device objects the lanes share, created together.
struct SharedResources {
    allocator: ConstantRegionAllocator,
    targets: FramebufferTargets,
    primitives: Primitives,
    samplers: Samplers,
}

impl SharedResources {
    /// Creates every shared object, destroying the ones already built when a
    /// later one fails.
    fn create(
        device: &dyn GraphicsDevice,
        settings: &RenderSettings,
        viewport: Extent2D,
    ) -> Result<Self, PipelineSetupError> {
        let allocator = ConstantRegionAllocator::new(device, settings.constant_buffer_cap)
            .map_err(RenderError::from)?;
        let targets = match FramebufferTargets::new(device, viewport) {
            Ok(targets) => targets,
            Err(e) => {
                allocator.destroy(device);
                return Err(e.into());
            }
        };
        let primitives = match Primitives::new(device) {
            Ok(primitives) => primitives,
            Err(e) => {
                targets.destroy(device);
                allocator.destroy(device);
                return Err(RenderError::from(e).into());
            }
        };
        match create_samplers(device) {
            Ok(samplers) => Ok(Self {
                allocator,
                targets,
                primitives,
                samplers,
            }),
            Err(e) => {
                primitives.destroy(device);
                targets.destroy(device);
                allocator.destroy(device);
                Err(RenderError::from(e).into())
            }
        }
    }
}

fn create_sampler(
    device: &dyn GraphicsDevice,
    label: &'static str,
    filter: FilterMode,
    address_mode: AddressMode,
) -> Result<SamplerId, ResourceError> {
    device.create_sampler(&SamplerDescriptor {
        label: Some(Cow::Borrowed(label)),
        filter,
        address_mode,
    })
}

fn create_samplers(device: &dyn GraphicsDevice) -> Result<Samplers, ResourceError> {
    let linear_repeat =
        create_sampler(device, "Linear Repeat", FilterMode::Linear, AddressMode::Repeat)?;
    let nearest_clamp =
        create_sampler(device, "Nearest Clamp", FilterMode::Nearest, AddressMode::ClampToEdge);
    match nearest_clamp {
        Ok(nearest_clamp) => Ok(Samplers {
            linear_repeat,
            nearest_clamp,
        }),
        Err(e) => {
            if let Err(destroy) = device.destroy_sampler(linear_repeat) {
                log::warn!("Failed to destroy sampler {linear_repeat:?}: {destroy}");
            }
            Err(e)
        }
    }
}

