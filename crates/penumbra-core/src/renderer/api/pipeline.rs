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

//! Shader programs, vertex layouts and render pipeline state.

use super::resource::{BufferId, TextureFormat};
use std::borrow::Cow;

/// An opaque handle to a compiled shader program (vertex + fragment stages).
///
/// A handle is the identity of one compilation: recompiling a program after a
/// hot reload yields a new `ShaderModuleId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);

/// Describes a shader program to compile.
///
/// The source holds both stages; the vertex stage is the code guarded by
/// `#ifdef VERTEX` and the fragment stage the code guarded by `FRAGMENT`.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// Debug label, usually the program name.
    pub label: Option<&'a str>,
    /// GLSL source text.
    pub source: Cow<'a, str>,
}

/// The data type of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One `f32`.
    Float32,
    /// Two `f32`.
    Float32x2,
    /// Three `f32`.
    Float32x3,
    /// Four `f32`.
    Float32x4,
}

impl VertexFormat {
    /// Number of components.
    pub fn component_count(self) -> u8 {
        match self {
            VertexFormat::Float32 => 1,
            VertexFormat::Float32x2 => 2,
            VertexFormat::Float32x3 => 3,
            VertexFormat::Float32x4 => 4,
        }
    }

    /// Size in bytes.
    pub fn size(self) -> u64 {
        self.component_count() as u64 * 4
    }
}

/// One attribute of a submesh's interleaved vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The shader input location this attribute feeds.
    pub location: u32,
    /// The attribute's data type.
    pub format: VertexFormat,
    /// Byte offset inside one vertex.
    pub offset: u64,
}

/// The interleaved vertex layout a submesh provides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    /// Bytes between consecutive vertices.
    pub stride: u64,
    /// The attributes, in any order.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Builds a tightly packed layout from `(location, format)` pairs.
    pub fn packed(attributes: &[(u32, VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes = attributes
            .iter()
            .map(|&(location, format)| {
                let attr = VertexAttribute {
                    location,
                    format,
                    offset,
                };
                offset += format.size();
                attr
            })
            .collect();
        Self {
            stride: offset,
            attributes,
        }
    }

    /// Finds the attribute feeding `location`.
    pub fn attribute_at(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }
}

/// One vertex input declared by a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderInputAttribute {
    /// The input location.
    pub location: u32,
    /// Number of components the shader reads.
    pub component_count: u8,
}

/// The vertex inputs of a shader program, obtained by reflection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderInputLayout {
    /// The inputs, sorted by location.
    pub attributes: Vec<ShaderInputAttribute>,
}

/// An opaque handle to a vertex binding: the association of a vertex/index
/// buffer pair and a subset of a vertex layout with a shader's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexBindingId(pub usize);

/// Describes a vertex binding to create.
#[derive(Debug, Clone)]
pub struct VertexBindingDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// The vertex buffer.
    pub vertex_buffer: BufferId,
    /// The index buffer (`u32` indices).
    pub index_buffer: BufferId,
    /// Byte offset of the first vertex in the vertex buffer.
    pub vertex_offset: u64,
    /// Bytes between consecutive vertices.
    pub stride: u64,
    /// The attributes enabled for the shader, one per shader input.
    pub attributes: Cow<'a, [VertexAttribute]>,
}

/// Which triangle faces are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    #[default]
    None,
    /// Cull front faces. Light volumes use this so the sphere still shades
    /// when the camera is inside it.
    Front,
    /// Cull back faces.
    Back,
}

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the incoming depth is less than the stored one.
    Less,
    /// Passes if the incoming depth is less than or equal to the stored one.
    LessEqual,
    /// Passes if the depths are equal.
    Equal,
    /// Passes if the incoming depth is greater than the stored one.
    Greater,
    /// Always passes.
    Always,
}

/// Depth test and write state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Format of the depth attachment.
    pub format: TextureFormat,
    /// Comparison used for the depth test.
    pub compare: CompareFunction,
    /// Whether passing fragments write their depth.
    pub write_enabled: bool,
}

/// How fragment output is combined with the attachment contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Output replaces the stored value.
    #[default]
    Replace,
    /// Output is added to the stored value (`ONE, ONE`).
    Additive,
}

/// One color target of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// Attachment format.
    pub format: TextureFormat,
    /// Blend mode.
    pub blend: BlendMode,
}

/// Describes a render pipeline state object.
///
/// An empty `color_targets` list disables color writes (depth-only pipeline).
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// The shader program.
    pub shader: ShaderModuleId,
    /// Color targets, in attachment order.
    pub color_targets: Cow<'a, [ColorTargetState]>,
    /// Depth state, `None` disables depth test and writes.
    pub depth: Option<DepthState>,
    /// Face culling.
    pub cull_mode: CullMode,
}

/// An opaque handle to a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout_offsets() {
        let layout = VertexLayout::packed(&[
            (0, VertexFormat::Float32x3),
            (1, VertexFormat::Float32x3),
            (2, VertexFormat::Float32x2),
        ]);
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.attribute_at(1).map(|a| a.offset), Some(12));
        assert_eq!(layout.attribute_at(2).map(|a| a.offset), Some(24));
        assert!(layout.attribute_at(3).is_none());
    }
}
