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

//! Buffers, textures, views and samplers.

use crate::math::Extent2D;
use bitflags::bitflags;
use std::borrow::Cow;

/// An opaque handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// An opaque handle to a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a view into a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureViewId(pub usize);

/// An opaque handle to a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub usize);

bitflags! {
    /// How a buffer is going to be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Can be bound as a vertex source.
        const VERTEX = 1 << 0;
        /// Can be bound as an index source.
        const INDEX = 1 << 1;
        /// Can be bound as a constant (uniform) block.
        const UNIFORM = 1 << 2;
        /// Can be the destination of a write or copy.
        const COPY_DST = 1 << 3;
        /// Can be the source of a copy.
        const COPY_SRC = 1 << 4;
    }
}

bitflags! {
    /// How a texture is going to be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 0;
        /// Can be a color or depth attachment of a render pass.
        const RENDER_ATTACHMENT = 1 << 1;
        /// Can be the source of a copy.
        const COPY_SRC = 1 << 2;
        /// Can be the destination of a copy or upload.
        const COPY_DST = 1 << 3;
    }
}

/// Describes a GPU buffer.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Size in bytes.
    pub size: u64,
    /// Allowed usages.
    pub usage: BufferUsage,
}

/// Texel formats known to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit normalized RGBA.
    Rgba8Unorm,
    /// 16-bit float RGBA, used for G-buffer position and normal.
    Rgba16Float,
    /// 8-bit normalized single channel, used for ambient occlusion.
    R8Unorm,
    /// 32-bit float single channel.
    R32Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns `true` for depth formats.
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }

    /// The number of color channels (1 for depth).
    pub fn channel_count(self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba16Float => 4,
            TextureFormat::R8Unorm | TextureFormat::R32Float | TextureFormat::Depth32Float => 1,
        }
    }

    /// The size of one texel in bytes.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::R8Unorm => 1,
            TextureFormat::R32Float | TextureFormat::Depth32Float => 4,
        }
    }
}

/// Describes a 2D GPU texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Size in texels.
    pub size: Extent2D,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
}

/// Describes a view into a texture.
#[derive(Debug, Clone, Default)]
pub struct TextureViewDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Bilinear interpolation.
    Linear,
}

/// Behavior outside of `[0, 1]` texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Tile the texture.
    Repeat,
}

/// Describes a sampler.
#[derive(Debug, Clone, Default)]
pub struct SamplerDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Filtering for magnification and minification.
    pub filter: FilterMode,
    /// Address mode for all axes.
    pub address_mode: AddressMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_properties() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Rgba16Float.is_depth());
        assert_eq!(TextureFormat::Rgba16Float.bytes_per_texel(), 8);
        assert_eq!(TextureFormat::R8Unorm.channel_count(), 1);
    }

    #[test]
    fn test_usage_flags_combine() {
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        assert!(usage.contains(TextureUsage::RENDER_ATTACHMENT));
        assert!(!usage.contains(TextureUsage::COPY_SRC));
    }
}
