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

//! Device capabilities and framebuffer validation.

use super::resource::TextureViewId;
use std::fmt;

/// Limits advertised by a graphics device that the renderer depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// The largest constant (uniform) block a shader may bind, in bytes.
    pub max_constant_block_size: u64,
    /// Required alignment of a constant block offset, a power of two.
    pub min_constant_offset_alignment: u64,
    /// The largest texture dimension.
    pub max_texture_dimension_2d: u32,
    /// The largest push-constant range, in bytes.
    pub max_push_constant_size: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_constant_block_size: 64 * 1024,
            min_constant_offset_alignment: 256,
            max_texture_dimension_2d: 8192,
            max_push_constant_size: 128,
        }
    }
}

/// The class of a physical adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// Integrated GPU.
    IntegratedGpu,
    /// Discrete GPU.
    DiscreteGpu,
    /// Software renderer or CPU emulation.
    Cpu,
    /// Unknown.
    #[default]
    Other,
}

/// Describes the adapter behind a graphics device.
#[derive(Debug, Clone, Default)]
pub struct AdapterInfo {
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Name of the backend API.
    pub backend: String,
    /// Adapter class.
    pub device_type: DeviceType,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// A set of attachments to validate as one framebuffer.
#[derive(Debug, Default)]
pub struct FramebufferDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Color attachments.
    pub color_attachments: &'a [TextureViewId],
    /// Optional depth attachment.
    pub depth_attachment: Option<TextureViewId>,
}

/// The result of framebuffer validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// All attachments exist, are renderable and share one size.
    Complete,
    /// The framebuffer cannot be rendered to.
    Incomplete(String),
}

impl FramebufferStatus {
    /// Returns `true` if the framebuffer is complete.
    pub fn is_complete(&self) -> bool {
        matches!(self, FramebufferStatus::Complete)
    }
}
