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

//! An in-memory [`GraphicsDevice`] that records and executes command buffers
//! on the CPU.
//!
//! Clears, copies and texture uploads update texel storage; draws are
//! validated against the bound state and counted but do not rasterize. Texels
//! are kept as `[f32; 4]` regardless of the declared format.

use super::command::{Command, HeadlessCommandEncoder};
use super::reflect;
use penumbra_core::math::{Extent2D, LinearRgba};
use penumbra_core::renderer::{
    AdapterInfo, BlendMode, BufferDescriptor, BufferId, BufferUsage, CommandBufferId,
    CommandEncoder, CullMode, DepthState, DeviceLimits, DeviceType, FramebufferDescriptor, FramebufferStatus,
    GraphicsDevice, LoadOp, PipelineError, RenderPipelineDescriptor, RenderPipelineId,
    ResourceError, SamplerDescriptor, SamplerId, ShaderError, ShaderInputLayout,
    ShaderModuleDescriptor, ShaderModuleId, TextureDescriptor, TextureFormat, TextureId,
    TextureUsage, TextureViewDescriptor, TextureViewId, VertexAttribute,
    VertexBindingDescriptor, VertexBindingId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct ShaderEntry {
    label: String,
    inputs: ShaderInputLayout,
}

#[derive(Debug)]
struct PipelineEntry {
    color_formats: Vec<TextureFormat>,
    state: PipelineState,
}

#[derive(Debug)]
struct BufferEntry {
    data: Vec<u8>,
    usage: BufferUsage,
}

#[derive(Debug)]
struct TextureEntry {
    label: String,
    size: Extent2D,
    format: TextureFormat,
    usage: TextureUsage,
    texels: Vec<[f32; 4]>,
}

#[derive(Debug)]
struct BindingEntry {
    index_buffer: BufferId,
}

#[derive(Debug)]
struct PendingCommandBuffer {
    label: Option<String>,
    commands: Vec<Command>,
}

/// Fixed-function state of a render pipeline as it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    /// The pipeline label.
    pub label: String,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Blend mode of each color target, in target order.
    pub blends: Vec<BlendMode>,
    /// Depth test and write, if the pipeline has a depth target.
    pub depth: Option<DepthState>,
}

/// What one render pass of a submitted command buffer did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// The pass label.
    pub label: Option<String>,
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Distinct pipelines bound, in binding order.
    pub pipelines: Vec<RenderPipelineId>,
    /// State of each pipeline in `pipelines`.
    pub pipeline_states: Vec<PipelineState>,
}

impl PassReport {
    /// The state of the bound pipeline with this label.
    pub fn pipeline_state(&self, label: &str) -> Option<&PipelineState> {
        self.pipeline_states.iter().find(|s| s.label == label)
    }
}

/// What one submitted command buffer did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    /// The encoder label.
    pub label: Option<String>,
    /// The render passes, in order.
    pub passes: Vec<PassReport>,
    /// Texture copies executed.
    pub copies: usize,
}

impl SubmissionReport {
    /// Draw calls over all passes.
    pub fn draw_calls(&self) -> u32 {
        self.passes.iter().map(|p| p.draw_calls).sum()
    }

    /// The pass with this label.
    pub fn pass(&self, label: &str) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.label.as_deref() == Some(label))
    }
}

/// Number of live objects of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    /// Shader modules.
    pub shader_modules: usize,
    /// Render pipelines.
    pub pipelines: usize,
    /// Buffers.
    pub buffers: usize,
    /// Textures.
    pub textures: usize,
    /// Texture views.
    pub texture_views: usize,
    /// Samplers.
    pub samplers: usize,
    /// Vertex bindings.
    pub vertex_bindings: usize,
}

#[derive(Debug)]
struct HeadlessDeviceInternal {
    limits: DeviceLimits,
    shader_modules: Mutex<HashMap<ShaderModuleId, ShaderEntry>>,
    pipelines: Mutex<HashMap<RenderPipelineId, PipelineEntry>>,
    buffers: Mutex<HashMap<BufferId, BufferEntry>>,
    textures: Mutex<HashMap<TextureId, TextureEntry>>,
    texture_views: Mutex<HashMap<TextureViewId, TextureId>>,
    samplers: Mutex<HashMap<SamplerId, SamplerDescriptor<'static>>>,
    vertex_bindings: Mutex<HashMap<VertexBindingId, BindingEntry>>,
    pending_command_buffers: Mutex<HashMap<CommandBufferId, PendingCommandBuffer>>,
    submissions: Mutex<Vec<SubmissionReport>>,
    next_id: AtomicUsize,
}

/// A clonable handle to the headless device.
#[derive(Clone, Debug)]
pub struct HeadlessDevice {
    internal: Arc<HeadlessDeviceInternal>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device advertising the default limits.
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    /// Creates a device advertising `limits`.
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            internal: Arc::new(HeadlessDeviceInternal {
                limits,
                shader_modules: Mutex::new(HashMap::new()),
                pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                samplers: Mutex::new(HashMap::new()),
                vertex_bindings: Mutex::new(HashMap::new()),
                pending_command_buffers: Mutex::new(HashMap::new()),
                submissions: Mutex::new(Vec::new()),
                next_id: AtomicUsize::new(1),
            }),
        }
    }

    fn next_id(&self) -> usize {
        self.internal.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Stores a finished command buffer until it is submitted.
    pub(crate) fn register_command_buffer(
        &self,
        label: Option<String>,
        commands: Vec<Command>,
    ) -> CommandBufferId {
        let id = CommandBufferId(self.next_id());
        lock(&self.internal.pending_command_buffers)
            .insert(id, PendingCommandBuffer { label, commands });
        id
    }

    /// The report of the most recent successful submission.
    pub fn last_submission(&self) -> Option<SubmissionReport> {
        lock(&self.internal.submissions).last().cloned()
    }

    /// Number of successful submissions.
    pub fn submission_count(&self) -> usize {
        lock(&self.internal.submissions).len()
    }

    /// Reads one texel. Depth textures store depth in the first channel.
    pub fn read_texel(&self, texture: TextureId, x: u32, y: u32) -> Option<[f32; 4]> {
        let textures = lock(&self.internal.textures);
        let entry = textures.get(&texture)?;
        if x >= entry.size.width || y >= entry.size.height {
            return None;
        }
        entry
            .texels
            .get((y * entry.size.width + x) as usize)
            .copied()
    }

    /// The size and format of a texture.
    pub fn texture_info(&self, texture: TextureId) -> Option<(Extent2D, TextureFormat)> {
        lock(&self.internal.textures)
            .get(&texture)
            .map(|t| (t.size, t.format))
    }

    /// A copy of a buffer's contents.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        lock(&self.internal.buffers)
            .get(&buffer)
            .map(|b| b.data.clone())
    }

    /// The label a shader module was compiled with.
    pub fn shader_label(&self, shader: ShaderModuleId) -> Option<String> {
        lock(&self.internal.shader_modules)
            .get(&shader)
            .map(|s| s.label.clone())
    }

    /// Live objects of each kind.
    pub fn resource_counts(&self) -> ResourceCounts {
        let internal = &self.internal;
        ResourceCounts {
            shader_modules: lock(&internal.shader_modules).len(),
            pipelines: lock(&internal.pipelines).len(),
            buffers: lock(&internal.buffers).len(),
            textures: lock(&internal.textures).len(),
            texture_views: lock(&internal.texture_views).len(),
            samplers: lock(&internal.samplers).len(),
            vertex_bindings: lock(&internal.vertex_bindings).len(),
        }
    }

    fn execute(
        &self,
        label: Option<String>,
        commands: &[Command],
    ) -> Result<SubmissionReport, ResourceError> {
        let pipelines = lock(&self.internal.pipelines);
        let bindings = lock(&self.internal.vertex_bindings);
        let buffers = lock(&self.internal.buffers);
        let mut textures = lock(&self.internal.textures);
        let views = lock(&self.internal.texture_views);
        let samplers = lock(&self.internal.samplers);

        let mut execution = Execution {
            limits: self.internal.limits,
            pipelines: &pipelines,
            bindings: &bindings,
            buffers: &buffers,
            textures: &mut textures,
            views: &views,
            samplers: &samplers,
            report: SubmissionReport {
                label,
                ..SubmissionReport::default()
            },
            pass: None,
            errors: Vec::new(),
        };
        for command in commands {
            execution.run(command);
        }
        if execution.pass.is_some() {
            execution.errors.push("command buffer ends inside a render pass".to_string());
        }

        if execution.errors.is_empty() {
            Ok(execution.report)
        } else {
            Err(ResourceError::BackendError(execution.errors.join("; ")))
        }
    }
}

/// State bound inside the current render pass.
#[derive(Debug, Default)]
struct PassState {
    report: PassReport,
    color_formats: Vec<TextureFormat>,
    attachments: Vec<TextureId>,
    has_depth: bool,
    pipeline: Option<RenderPipelineId>,
    binding: Option<VertexBindingId>,
}

struct Execution<'a> {
    limits: DeviceLimits,
    pipelines: &'a HashMap<RenderPipelineId, PipelineEntry>,
    bindings: &'a HashMap<VertexBindingId, BindingEntry>,
    buffers: &'a HashMap<BufferId, BufferEntry>,
    textures: &'a mut HashMap<TextureId, TextureEntry>,
    views: &'a HashMap<TextureViewId, TextureId>,
    samplers: &'a HashMap<SamplerId, SamplerDescriptor<'static>>,
    report: SubmissionReport,
    pass: Option<PassState>,
    errors: Vec<String>,
}

impl Execution<'_> {
    fn pass_name(&self) -> String {
        self.pass
            .as_ref()
            .and_then(|p| p.report.label.clone())
            .unwrap_or_else(|| "unlabeled pass".to_string())
    }

    fn fail(&mut self, message: String) {
        let message = format!("{}: {message}", self.pass_name());
        log::error!("Headless validation: {message}");
        self.errors.push(message);
    }

    fn in_pass(&mut self, command: &str) -> bool {
        if self.pass.is_none() {
            self.errors.push(format!("{command} recorded outside a render pass"));
            return false;
        }
        true
    }

    fn run(&mut self, command: &Command) {
        let (pipelines, bindings, buffers, views, samplers) = (
            self.pipelines,
            self.bindings,
            self.buffers,
            self.views,
            self.samplers,
        );
        match command {
            Command::BeginPass { label, color, depth } => {
                if self.pass.is_some() {
                    self.fail("render pass begun inside another pass".to_string());
                    return;
                }
                let mut state = PassState {
                    report: PassReport {
                        label: label.clone(),
                        ..PassReport::default()
                    },
                    has_depth: depth.is_some(),
                    ..PassState::default()
                };
                for attachment in color {
                    match self.clear_target(attachment.view, color_load(attachment.ops.load)) {
                        Ok((texture, format)) => {
                            state.attachments.push(texture);
                            state.color_formats.push(format);
                        }
                        Err(e) => self.errors.push(e),
                    }
                }
                if let Some(depth) = depth {
                    let load = match depth.depth_ops.load {
                        LoadOp::Load => LoadOp::Load,
                        LoadOp::Clear(d) => LoadOp::Clear([d, 0.0, 0.0, 0.0]),
                    };
                    match self.clear_target(depth.view, load) {
                        Ok((texture, format)) if format.is_depth() => {
                            state.attachments.push(texture);
                        }
                        Ok((_, format)) => self
                            .errors
                            .push(format!("{format:?} used as a depth attachment")),
                        Err(e) => self.errors.push(e),
                    }
                }
                self.pass = Some(state);
            }
            Command::SetPipeline(id) => {
                if !self.in_pass("set_pipeline") {
                    return;
                }
                let Some(entry) = pipelines.get(id) else {
                    self.fail(format!("unknown pipeline {id:?}"));
                    return;
                };
                let Some(pass) = self.pass.as_mut() else { return };
                let mismatch = if entry.color_formats != pass.color_formats {
                    Some(format!(
                        "pipeline '{}' targets {:?} but the pass renders to {:?}",
                        entry.state.label, entry.color_formats, pass.color_formats
                    ))
                } else if entry.state.depth.is_some() != pass.has_depth {
                    Some(format!(
                        "pipeline '{}' depth state does not match the pass",
                        entry.state.label
                    ))
                } else {
                    None
                };
                pass.pipeline = Some(*id);
                if !pass.report.pipelines.contains(id) {
                    pass.report.pipelines.push(*id);
                    pass.report.pipeline_states.push(entry.state.clone());
                }
                if let Some(message) = mismatch {
                    self.fail(message);
                }
            }
            Command::SetVertexBinding(id) => {
                if !self.in_pass("set_vertex_binding") {
                    return;
                }
                if !bindings.contains_key(id) {
                    self.fail(format!("unknown vertex binding {id:?}"));
                    return;
                }
                if let Some(pass) = self.pass.as_mut() {
                    pass.binding = Some(*id);
                }
            }
            Command::SetConstantBlock {
                slot,
                buffer,
                offset,
                size,
            } => {
                if !self.in_pass("set_constant_block") {
                    return;
                }
                let Some(entry) = buffers.get(buffer) else {
                    self.fail(format!("slot {slot}: unknown buffer {buffer:?}"));
                    return;
                };
                if !entry.usage.contains(BufferUsage::UNIFORM) {
                    self.fail(format!("slot {slot}: buffer {buffer:?} is not a uniform buffer"));
                } else if offset % self.limits.min_constant_offset_alignment != 0 {
                    self.fail(format!(
                        "slot {slot}: offset {offset} is not a multiple of {}",
                        self.limits.min_constant_offset_alignment
                    ));
                } else if offset + size > entry.data.len() as u64 {
                    self.fail(format!(
                        "slot {slot}: range {offset}..{} exceeds buffer of {} bytes",
                        offset + size,
                        entry.data.len()
                    ));
                } else if *size > self.limits.max_constant_block_size {
                    self.fail(format!("slot {slot}: block of {size} bytes exceeds the limit"));
                }
            }
            Command::SetTexture {
                slot,
                view,
                sampler,
            } => {
                if !self.in_pass("set_texture") {
                    return;
                }
                let Some(texture) = views.get(view).copied() else {
                    self.fail(format!("slot {slot}: unknown texture view {view:?}"));
                    return;
                };
                if !samplers.contains_key(sampler) {
                    self.fail(format!("slot {slot}: unknown sampler {sampler:?}"));
                }
                let sampled_while_rendered = self
                    .pass
                    .as_ref()
                    .is_some_and(|p| p.attachments.contains(&texture));
                if sampled_while_rendered {
                    self.fail(format!("slot {slot}: texture {texture:?} is also an attachment"));
                }
            }
            Command::SetPushConstants { offset, len } => {
                if !self.in_pass("set_push_constants") {
                    return;
                }
                if *offset as usize + len > self.limits.max_push_constant_size as usize {
                    self.fail(format!("push constants {offset}+{len} exceed the limit"));
                }
            }
            Command::Draw { vertices } => {
                if !self.in_pass("draw") {
                    return;
                }
                self.draw(None, vertices.end);
            }
            Command::DrawIndexed { indices } => {
                if !self.in_pass("draw_indexed") {
                    return;
                }
                let binding = self.pass.as_ref().and_then(|p| p.binding);
                match binding.and_then(|b| bindings.get(&b)) {
                    Some(entry) => {
                        let index_bytes = self
                            .buffers
                            .get(&entry.index_buffer)
                            .map_or(0, |b| b.data.len() as u64);
                        self.draw(Some(index_bytes / 4), indices.end);
                    }
                    None => self.fail("draw_indexed without a vertex binding".to_string()),
                }
            }
            Command::EndPass => match self.pass.take() {
                Some(state) => self.report.passes.push(state.report),
                None => self.errors.push("pass ended twice".to_string()),
            },
            Command::CopyTexture {
                source,
                destination,
                size,
            } => {
                if self.pass.is_some() {
                    self.fail("texture copy inside a render pass".to_string());
                    return;
                }
                match self.copy(*source, *destination, *size) {
                    Ok(()) => self.report.copies += 1,
                    Err(e) => self.errors.push(e),
                }
            }
        }
    }

    fn draw(&mut self, index_count: Option<u64>, end: u32) {
        if self.pass.as_ref().is_some_and(|p| p.pipeline.is_none()) {
            self.fail("draw without a pipeline".to_string());
            return;
        }
        if let Some(count) = index_count {
            if u64::from(end) > count {
                self.fail(format!("index range ends at {end} but the buffer holds {count}"));
                return;
            }
        }
        if let Some(pass) = self.pass.as_mut() {
            pass.report.draw_calls += 1;
        }
    }

    fn clear_target(
        &mut self,
        view: TextureViewId,
        load: LoadOp<[f32; 4]>,
    ) -> Result<(TextureId, TextureFormat), String> {
        let texture = *self
            .views
            .get(&view)
            .ok_or_else(|| format!("unknown attachment view {view:?}"))?;
        let entry = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| format!("view {view:?} outlived its texture"))?;
        if !entry.usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            return Err(format!("'{}' is not a render attachment", entry.label));
        }
        if let LoadOp::Clear(value) = load {
            entry.texels.fill(value);
        }
        Ok((texture, entry.format))
    }

    fn copy(
        &mut self,
        source: TextureId,
        destination: TextureId,
        size: Extent2D,
    ) -> Result<(), String> {
        let src = self
            .textures
            .get(&source)
            .ok_or_else(|| format!("unknown copy source {source:?}"))?;
        let dst = self
            .textures
            .get(&destination)
            .ok_or_else(|| format!("unknown copy destination {destination:?}"))?;
        if src.format != dst.format {
            return Err(format!(
                "copy from {:?} to {:?} changes format",
                src.format, dst.format
            ));
        }
        let fits = |t: &TextureEntry| size.width <= t.size.width && size.height <= t.size.height;
        if !fits(src) || !fits(dst) {
            return Err(format!("copy of {}x{} is out of bounds", size.width, size.height));
        }
        if !src.usage.contains(TextureUsage::COPY_SRC)
            || !dst.usage.contains(TextureUsage::COPY_DST)
        {
            return Err(format!("copy '{}' -> '{}' lacks copy usage", src.label, dst.label));
        }

        let src_width = src.size.width as usize;
        let rows: Vec<Vec<[f32; 4]>> = (0..size.height as usize)
            .map(|y| src.texels[y * src_width..y * src_width + size.width as usize].to_vec())
            .collect();
        let dst = self
            .textures
            .get_mut(&destination)
            .ok_or_else(|| format!("unknown copy destination {destination:?}"))?;
        let dst_width = dst.size.width as usize;
        for (y, row) in rows.into_iter().enumerate() {
            dst.texels[y * dst_width..y * dst_width + row.len()].copy_from_slice(&row);
        }
        Ok(())
    }
}

fn color_load(load: LoadOp<LinearRgba>) -> LoadOp<[f32; 4]> {
    match load {
        LoadOp::Load => LoadOp::Load,
        LoadOp::Clear(c) => LoadOp::Clear([c.r, c.g, c.b, c.a]),
    }
}

fn unorm_texel(bytes: &[u8]) -> [f32; 4] {
    let mut texel = [0.0; 4];
    for (channel, &byte) in texel.iter_mut().zip(bytes) {
        *channel = f32::from(byte) / 255.0;
    }
    texel
}

fn decode_texels(format: TextureFormat, data: &[u8]) -> Result<Vec<[f32; 4]>, ResourceError> {
    let texels = match format {
        TextureFormat::Rgba8Unorm => data.chunks_exact(4).map(unorm_texel).collect(),
        TextureFormat::R8Unorm => data
            .iter()
            .map(|&r| [f32::from(r) / 255.0, 0.0, 0.0, 1.0])
            .collect(),
        TextureFormat::R32Float | TextureFormat::Depth32Float => data
            .chunks_exact(4)
            .map(|c| [bytemuck::pod_read_unaligned::<f32>(c), 0.0, 0.0, 1.0])
            .collect(),
        TextureFormat::Rgba16Float => {
            return Err(ResourceError::BackendError(
                "uploads to Rgba16Float textures are not supported".to_string(),
            ))
        }
    };
    Ok(texels)
}

impl GraphicsDevice for HeadlessDevice {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "Penumbra Headless".to_string(),
            backend: "Headless".to_string(),
            device_type: DeviceType::Cpu,
        }
    }

    fn limits(&self) -> DeviceLimits {
        self.internal.limits
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label.unwrap_or("unnamed").to_string();
        let compile_error = |details: String| {
            ResourceError::Shader(ShaderError::CompilationError {
                label: label.clone(),
                details,
            })
        };
        reflect::check_source(&descriptor.source).map_err(compile_error)?;
        let inputs = reflect::reflect_vertex_inputs(&descriptor.source).map_err(compile_error)?;

        let id = ShaderModuleId(self.next_id());
        log::debug!(
            "Compiled shader '{label}' as {id:?} with {} vertex input(s)",
            inputs.attributes.len()
        );
        lock(&self.internal.shader_modules).insert(id, ShaderEntry { label, inputs });
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        lock(&self.internal.shader_modules)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::Shader(ShaderError::NotFound { id }))
    }

    fn shader_input_layout(&self, id: ShaderModuleId) -> Result<ShaderInputLayout, ResourceError> {
        lock(&self.internal.shader_modules)
            .get(&id)
            .map(|s| s.inputs.clone())
            .ok_or(ResourceError::Shader(ShaderError::NotFound { id }))
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let label = descriptor.label.as_deref().map(str::to_string);
        if !lock(&self.internal.shader_modules).contains_key(&descriptor.shader) {
            return Err(ShaderError::NotFound {
                id: descriptor.shader,
            }
            .into());
        }
        let invalid = |details: String| {
            ResourceError::Pipeline(PipelineError::CompilationFailed {
                label: label.clone(),
                details,
            })
        };
        if let Some(target) = descriptor.color_targets.iter().find(|t| t.format.is_depth()) {
            return Err(invalid(format!("{:?} is not a color format", target.format)));
        }
        if let Some(depth) = descriptor.depth.filter(|d| !d.format.is_depth()) {
            return Err(invalid(format!("{:?} is not a depth format", depth.format)));
        }

        let id = RenderPipelineId(self.next_id());
        lock(&self.internal.pipelines).insert(
            id,
            PipelineEntry {
                color_formats: descriptor.color_targets.iter().map(|t| t.format).collect(),
                state: PipelineState {
                    label: label.unwrap_or_else(|| "unnamed".to_string()),
                    cull_mode: descriptor.cull_mode,
                    blends: descriptor.color_targets.iter().map(|t| t.blend).collect(),
                    depth: descriptor.depth,
                },
            },
        );
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), ResourceError> {
        lock(&self.internal.pipelines)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::Pipeline(PipelineError::InvalidRenderPipeline { id }))
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id());
        lock(&self.internal.buffers).insert(
            id,
            BufferEntry {
                data: vec![0; descriptor.size as usize],
                usage: descriptor.usage,
            },
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id());
        lock(&self.internal.buffers).insert(
            id,
            BufferEntry {
                data: data.to_vec(),
                usage: descriptor.usage,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        lock(&self.internal.buffers)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.buffers);
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        let end = start + data.len();
        let target = buffer
            .data
            .get_mut(start..end)
            .ok_or(ResourceError::OutOfBounds)?;
        target.copy_from_slice(data);
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let size = descriptor.size;
        let max = self.internal.limits.max_texture_dimension_2d;
        if size.is_empty() || size.width > max || size.height > max {
            return Err(ResourceError::BackendError(format!(
                "texture size {}x{} outside 1..={max}",
                size.width, size.height
            )));
        }
        let id = TextureId(self.next_id());
        lock(&self.internal.textures).insert(
            id,
            TextureEntry {
                label: descriptor
                    .label
                    .as_deref()
                    .unwrap_or("unnamed")
                    .to_string(),
                size,
                format: descriptor.format,
                usage: descriptor.usage,
                texels: vec![[0.0; 4]; size.area()],
            },
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        lock(&self.internal.textures)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn write_texture(&self, id: TextureId, data: &[u8]) -> Result<(), ResourceError> {
        let mut textures = lock(&self.internal.textures);
        let texture = textures.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let expected = texture.size.area() * texture.format.bytes_per_texel() as usize;
        if data.len() != expected {
            return Err(ResourceError::OutOfBounds);
        }
        texture.texels = decode_texels(texture.format, data)?;
        Ok(())
    }

    fn create_texture_view(
        &self,
        texture_id: TextureId,
        _descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        if !lock(&self.internal.textures).contains_key(&texture_id) {
            return Err(ResourceError::NotFound);
        }
        let id = TextureViewId(self.next_id());
        lock(&self.internal.texture_views).insert(id, texture_id);
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        lock(&self.internal.texture_views)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let id = SamplerId(self.next_id());
        lock(&self.internal.samplers).insert(
            id,
            SamplerDescriptor {
                label: descriptor.label.clone().map(|l| l.into_owned().into()),
                filter: descriptor.filter,
                address_mode: descriptor.address_mode,
            },
        );
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        lock(&self.internal.samplers)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_vertex_binding(
        &self,
        descriptor: &VertexBindingDescriptor,
    ) -> Result<VertexBindingId, ResourceError> {
        {
            let buffers = lock(&self.internal.buffers);
            if !buffers.contains_key(&descriptor.vertex_buffer)
                || !buffers.contains_key(&descriptor.index_buffer)
            {
                return Err(ResourceError::NotFound);
            }
        }
        let overruns = |a: &&VertexAttribute| a.offset + a.format.size() > descriptor.stride;
        if let Some(attribute) = descriptor.attributes.iter().find(overruns) {
            return Err(ResourceError::BackendError(format!(
                "attribute at location {} overruns the vertex stride {}",
                attribute.location, descriptor.stride
            )));
        }
        let id = VertexBindingId(self.next_id());
        lock(&self.internal.vertex_bindings).insert(
            id,
            BindingEntry {
                index_buffer: descriptor.index_buffer,
            },
        );
        Ok(id)
    }

    fn destroy_vertex_binding(&self, id: VertexBindingId) -> Result<(), ResourceError> {
        lock(&self.internal.vertex_bindings)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn validate_framebuffer(&self, descriptor: &FramebufferDescriptor) -> FramebufferStatus {
        let views = lock(&self.internal.texture_views);
        let textures = lock(&self.internal.textures);
        let resolve = |view: TextureViewId| views.get(&view).and_then(|t| textures.get(t));

        let mut size = None;
        let color = descriptor.color_attachments.iter().map(|v| (*v, false));
        let depth = descriptor.depth_attachment.map(|v| (v, true));
        for (view, is_depth) in color.chain(depth) {
            let Some(texture) = resolve(view) else {
                return FramebufferStatus::Incomplete(format!("missing attachment {view:?}"));
            };
            if !texture.usage.contains(TextureUsage::RENDER_ATTACHMENT) {
                return FramebufferStatus::Incomplete(format!(
                    "'{}' is not renderable",
                    texture.label
                ));
            }
            if texture.format.is_depth() != is_depth {
                return FramebufferStatus::Incomplete(format!(
                    "'{}' has format {:?} in the wrong attachment point",
                    texture.label, texture.format
                ));
            }
            match size {
                None => size = Some(texture.size),
                Some(s) if s != texture.size => {
                    return FramebufferStatus::Incomplete(format!(
                        "'{}' is {}x{}, other attachments are {}x{}",
                        texture.label, texture.size.width, texture.size.height, s.width, s.height
                    ));
                }
                Some(_) => {}
            }
        }
        if size.is_none() {
            return FramebufferStatus::Incomplete("no attachments".to_string());
        }
        FramebufferStatus::Complete
    }

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(HeadlessCommandEncoder {
            device: self.clone(),
            label: label.map(str::to_string),
            commands: Vec::new(),
        })
    }

    fn submit_command_buffer(&self, command_buffer: CommandBufferId) -> Result<(), ResourceError> {
        let pending = lock(&self.internal.pending_command_buffers)
            .remove(&command_buffer)
            .ok_or(ResourceError::InvalidHandle)?;
        let report = self.execute(pending.label, &pending.commands)?;
        log::trace!(
            "Submitted {command_buffer:?}: {} pass(es), {} draw(s)",
            report.passes.len(),
            report.draw_calls()
        );
        lock(&self.internal.submissions).push(report);
        Ok(())
    }
}
