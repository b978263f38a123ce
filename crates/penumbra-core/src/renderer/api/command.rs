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

//! Descriptors for render passes and recorded command buffers.

use super::resource::TextureViewId;
use crate::math::LinearRgba;

/// Describes the operation to perform on an attachment at the start of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment are kept.
    Load,
    /// The attachment is cleared to the value before the pass begins.
    Clear(V),
}

/// Describes the operation to perform on an attachment at the end of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// The results are written back.
    Store,
    /// The results are discarded.
    Discard,
}

/// Load and store operations for one attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Operations<V> {
    /// Operation at the beginning of the pass.
    pub load: LoadOp<V>,
    /// Operation at the end of the pass.
    pub store: StoreOp,
}

impl<V> Operations<V> {
    /// Clear to `value`, then store.
    pub fn clear(value: V) -> Self {
        Self {
            load: LoadOp::Clear(value),
            store: StoreOp::Store,
        }
    }

    /// Keep the existing contents, then store.
    pub fn load() -> Self {
        Self {
            load: LoadOp::Load,
            store: StoreOp::Store,
        }
    }
}

/// A color attachment of a render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderPassColorAttachment {
    /// The view rendered to.
    pub view: TextureViewId,
    /// Load and store operations.
    pub ops: Operations<LinearRgba>,
}

/// The depth attachment of a render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderPassDepthAttachment {
    /// The depth view.
    pub view: TextureViewId,
    /// Load and store operations for depth.
    pub depth_ops: Operations<f32>,
}

/// A descriptor for a render pass.
#[derive(Debug, Default)]
pub struct RenderPassDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Color attachments, bound to fragment outputs in order.
    pub color_attachments: &'a [RenderPassColorAttachment],
    /// Optional depth attachment.
    pub depth_attachment: Option<RenderPassDepthAttachment>,
}

/// An opaque handle to a finished, not yet submitted, command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub usize);
