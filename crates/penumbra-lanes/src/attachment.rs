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

//! Render targets shared between lanes.

use penumbra_core::renderer::TextureFormat;
use penumbra_core::DisplayAttachment;

/// One render target of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attachment {
    /// Depth written by the pre-pass.
    PrePassDepth,
    /// Copy of the pre-pass depth tested by the geometry pass.
    GBufferDepth,
    /// World-space positions.
    Position,
    /// World-space normals.
    Normal,
    /// Albedo in RGB, specular in alpha.
    AlbedoSpecular,
    /// Linear depth as a grayscale color.
    DepthView,
    /// Raw ambient occlusion.
    AmbientOcclusion,
    /// Blurred ambient occlusion.
    BlurredAmbientOcclusion,
    /// Lit image.
    FinalComposite,
    /// The presented image.
    Surface,
}

impl Attachment {
    /// Every attachment, in creation order.
    pub const ALL: [Attachment; 10] = [
        Attachment::PrePassDepth,
        Attachment::GBufferDepth,
        Attachment::Position,
        Attachment::Normal,
        Attachment::AlbedoSpecular,
        Attachment::DepthView,
        Attachment::AmbientOcclusion,
        Attachment::BlurredAmbientOcclusion,
        Attachment::FinalComposite,
        Attachment::Surface,
    ];

    /// The texel format of the target.
    pub fn format(self) -> TextureFormat {
        match self {
            Attachment::PrePassDepth | Attachment::GBufferDepth => TextureFormat::Depth32Float,
            Attachment::Position | Attachment::Normal => TextureFormat::Rgba16Float,
            Attachment::AlbedoSpecular
            | Attachment::DepthView
            | Attachment::FinalComposite
            | Attachment::Surface => TextureFormat::Rgba8Unorm,
            Attachment::AmbientOcclusion | Attachment::BlurredAmbientOcclusion => {
                TextureFormat::R8Unorm
            }
        }
    }

    /// Debug label.
    pub fn label(self) -> &'static str {
        match self {
            Attachment::PrePassDepth => "Pre-pass Depth",
            Attachment::GBufferDepth => "G-buffer Depth",
            Attachment::Position => "G-buffer Position",
            Attachment::Normal => "G-buffer Normal",
            Attachment::AlbedoSpecular => "G-buffer Albedo/Specular",
            Attachment::DepthView => "G-buffer Depth View",
            Attachment::AmbientOcclusion => "Ambient Occlusion",
            Attachment::BlurredAmbientOcclusion => "Blurred Ambient Occlusion",
            Attachment::FinalComposite => "Final Composite",
            Attachment::Surface => "Surface",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl From<DisplayAttachment> for Attachment {
    fn from(display: DisplayAttachment) -> Self {
        match display {
            DisplayAttachment::Position => Attachment::Position,
            DisplayAttachment::Normal => Attachment::Normal,
            DisplayAttachment::Albedo => Attachment::AlbedoSpecular,
            DisplayAttachment::DepthView => Attachment::DepthView,
            DisplayAttachment::AmbientOcclusion => Attachment::AmbientOcclusion,
            DisplayAttachment::BlurredAmbientOcclusion => Attachment::BlurredAmbientOcclusion,
            DisplayAttachment::FinalComposite => Attachment::FinalComposite,
        }
    }
}
