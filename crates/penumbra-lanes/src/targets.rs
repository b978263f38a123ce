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

//! The framebuffer attachments of the deferred pipeline.

use crate::attachment::Attachment;
use penumbra_core::math::Extent2D;
use penumbra_core::renderer::{
    FramebufferDescriptor, FramebufferStatus, GraphicsDevice, RenderError, TextureDescriptor,
    TextureId, TextureUsage, TextureViewDescriptor, TextureViewId,
};
use std::borrow::Cow;

/// A texture and its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// The texture.
    pub texture: TextureId,
    /// The view used as attachment and shader input.
    pub view: TextureViewId,
}

/// The attachment groups rendered to together, checked at creation.
const FRAMEBUFFERS: [(&str, &[Attachment], Option<Attachment>); 6] = [
    ("Pre-pass", &[], Some(Attachment::PrePassDepth)),
    (
        "G-buffer",
        &[
            Attachment::Position,
            Attachment::Normal,
            Attachment::AlbedoSpecular,
            Attachment::DepthView,
        ],
        Some(Attachment::GBufferDepth),
    ),
    ("SSAO", &[Attachment::AmbientOcclusion], None),
    ("SSAO Blur", &[Attachment::BlurredAmbientOcclusion], None),
    ("Lighting", &[Attachment::FinalComposite], None),
    ("Composite", &[Attachment::Surface], None),
];

/// Every render target of a frame, sized to the viewport.
#[derive(Debug)]
pub struct FramebufferTargets {
    size: Extent2D,
    targets: Vec<Target>,
    generation: u64,
}

impl FramebufferTargets {
    /// Creates every attachment at `size` (clamped to at least 1x1) and
    /// validates the framebuffers.
    ///
    /// ## Errors
    /// * `RenderError::FramebufferIncomplete` - If the device rejects a framebuffer.
    pub fn new(device: &dyn GraphicsDevice, size: Extent2D) -> Result<Self, RenderError> {
        let size = size.clamped_to_min();
        let targets = create_targets(device, size)?;
        let targets = Self {
            size,
            targets,
            generation: 1,
        };
        if let Err(e) = targets.validate(device) {
            targets.destroy(device);
            return Err(e);
        }
        log::info!(
            "Created {} render targets at {}x{}",
            Attachment::ALL.len(),
            size.width,
            size.height
        );
        Ok(targets)
    }

    /// Recreates the attachments when `size` differs from the current size.
    ///
    /// Returns `true` if the targets were recreated.
    pub fn resize(&mut self, device: &dyn GraphicsDevice, size: Extent2D) -> Result<bool, RenderError> {
        let size = size.clamped_to_min();
        if size == self.size {
            return Ok(false);
        }
        let fresh = Self::new(device, size)?;
        let old = std::mem::replace(&mut self.targets, fresh.targets);
        release_targets(device, old);
        self.size = size;
        self.generation += 1;
        Ok(true)
    }

    /// The current size.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// Number of times the targets were created, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The texture and view of an attachment.
    pub fn target(&self, attachment: Attachment) -> Target {
        self.targets[attachment.index()]
    }

    /// The view of an attachment.
    pub fn view(&self, attachment: Attachment) -> TextureViewId {
        self.target(attachment).view
    }

    /// The texture of an attachment.
    pub fn texture(&self, attachment: Attachment) -> TextureId {
        self.target(attachment).texture
    }

    /// Destroys every attachment.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        release_targets(device, self.targets);
    }

    fn validate(&self, device: &dyn GraphicsDevice) -> Result<(), RenderError> {
        for (label, colors, depth) in FRAMEBUFFERS {
            let color_views: Vec<_> = colors.iter().map(|a| self.view(*a)).collect();
            let status = device.validate_framebuffer(&FramebufferDescriptor {
                label: Some(label),
                color_attachments: &color_views,
                depth_attachment: depth.map(|a| self.view(a)),
            });
            if let FramebufferStatus::Incomplete(reason) = status {
                log::error!("Framebuffer '{label}' is incomplete: {reason}");
                return Err(RenderError::FramebufferIncomplete {
                    label: label.to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

fn create_targets(device: &dyn GraphicsDevice, size: Extent2D) -> Result<Vec<Target>, RenderError> {
    let mut targets = Vec::with_capacity(Attachment::ALL.len());
    for attachment in Attachment::ALL {
        let created = create_target(device, attachment, size);
        match created {
            Ok(target) => targets.push(target),
            Err(e) => {
                release_targets(device, targets);
                return Err(e.into());
            }
        }
    }
    Ok(targets)
}

fn create_target(
    device: &dyn GraphicsDevice,
    attachment: Attachment,
    size: Extent2D,
) -> Result<Target, penumbra_core::renderer::ResourceError> {
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(Cow::Borrowed(attachment.label())),
        size,
        format: attachment.format(),
        usage: TextureUsage::RENDER_ATTACHMENT
            | TextureUsage::TEXTURE_BINDING
            | TextureUsage::COPY_SRC
            | TextureUsage::COPY_DST,
    })?;
    let view = device.create_texture_view(
        texture,
        &TextureViewDescriptor {
            label: Some(Cow::Borrowed(attachment.label())),
        },
    );
    match view {
        Ok(view) => Ok(Target { texture, view }),
        Err(e) => {
            if let Err(destroy) = device.destroy_texture(texture) {
                log::warn!("Failed to destroy render target {texture:?}: {destroy}");
            }
            Err(e)
        }
    }
}

fn release_targets(device: &dyn GraphicsDevice, targets: Vec<Target>) {
    for target in targets {
        if let Err(e) = device.destroy_texture_view(target.view) {
            log::warn!("Failed to destroy render target view {:?}: {e}", target.view);
        }
        if let Err(e) = device.destroy_texture(target.texture) {
            log::warn!("Failed to destroy render target {:?}: {e}", target.texture);
        }
    }
}
