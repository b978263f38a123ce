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

use penumbra_core::math::{Extent2D, LinearRgba};
use penumbra_core::renderer::{
    BlendMode, BufferDescriptor, BufferUsage, ColorTargetState, CullMode, FramebufferDescriptor,
    GraphicsDevice, Operations, RenderPassColorAttachment, RenderPassDescriptor,
    RenderPipelineDescriptor, ResourceError, ShaderModuleDescriptor, TextureDescriptor,
    TextureFormat, TextureId, TextureUsage, TextureViewDescriptor, TextureViewId,
};
use penumbra_infra::HeadlessDevice;
use std::borrow::Cow;

const SHADER: &str = "#ifdef VERTEX\nlayout(location = 0) in vec3 aPosition;\n#endif\n";

fn target(
    device: &HeadlessDevice,
    format: TextureFormat,
    size: Extent2D,
) -> (TextureId, TextureViewId) {
    let texture = device
        .create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("Target")),
            size,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT
                | TextureUsage::TEXTURE_BINDING
                | TextureUsage::COPY_SRC
                | TextureUsage::COPY_DST,
        })
        .unwrap();
    let view = device
        .create_texture_view(texture, &TextureViewDescriptor::default())
        .unwrap();
    (texture, view)
}

#[test]
fn test_clear_and_copy_update_texels() {
    let device = HeadlessDevice::new();
    let size = Extent2D::new(4, 2);
    let (color, color_view) = target(&device, TextureFormat::Rgba8Unorm, size);
    let (copy, _) = target(&device, TextureFormat::Rgba8Unorm, size);

    let clear = LinearRgba::new(0.25, 0.5, 0.75, 1.0);
    let mut encoder = device.create_command_encoder(Some("Test"));
    {
        let _pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Clear"),
            color_attachments: &[RenderPassColorAttachment {
                view: color_view,
                ops: Operations::clear(clear),
            }],
            depth_attachment: None,
        });
    }
    encoder.copy_texture_to_texture(color, copy, size);
    device.submit_command_buffer(encoder.finish()).unwrap();

    assert_eq!(device.read_texel(color, 3, 1), Some([0.25, 0.5, 0.75, 1.0]));
    assert_eq!(device.read_texel(copy, 0, 0), Some([0.25, 0.5, 0.75, 1.0]));
    assert_eq!(device.read_texel(copy, 4, 0), None);

    let report = device.last_submission().unwrap();
    assert_eq!(report.copies, 1);
    assert_eq!(report.pass("Clear").map(|p| p.draw_calls), Some(0));
}

#[test]
fn test_draw_without_pipeline_fails_submission() {
    let device = HeadlessDevice::new();
    let (_, view) = target(&device, TextureFormat::Rgba8Unorm, Extent2D::new(2, 2));

    let mut encoder = device.create_command_encoder(None);
    {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Broken"),
            color_attachments: &[RenderPassColorAttachment {
                view,
                ops: Operations::load(),
            }],
            depth_attachment: None,
        });
        pass.draw(0..3, 0..1);
    }
    let result = device.submit_command_buffer(encoder.finish());
    assert!(matches!(result, Err(ResourceError::BackendError(_))));
    assert_eq!(device.submission_count(), 0);
}

#[test]
fn test_pipeline_must_match_pass_targets() {
    let device = HeadlessDevice::new();
    let (_, view) = target(&device, TextureFormat::Rgba8Unorm, Extent2D::new(2, 2));
    let shader = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("test"),
            source: Cow::Borrowed(SHADER),
        })
        .unwrap();
    let pipeline = device
        .create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed("R8")),
            shader,
            color_targets: Cow::Owned(vec![ColorTargetState {
                format: TextureFormat::R8Unorm,
                blend: BlendMode::Replace,
            }]),
            depth: None,
            cull_mode: CullMode::None,
        })
        .unwrap();

    let mut encoder = device.create_command_encoder(None);
    {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Mismatch"),
            color_attachments: &[RenderPassColorAttachment {
                view,
                ops: Operations::load(),
            }],
            depth_attachment: None,
        });
        pass.set_pipeline(pipeline);
        pass.draw(0..3, 0..1);
    }
    assert!(device.submit_command_buffer(encoder.finish()).is_err());
}

#[test]
fn test_framebuffer_validation() {
    let device = HeadlessDevice::new();
    let (_, small) = target(&device, TextureFormat::Rgba8Unorm, Extent2D::new(2, 2));
    let (_, large) = target(&device, TextureFormat::Rgba8Unorm, Extent2D::new(4, 4));
    let (_, depth) = target(&device, TextureFormat::Depth32Float, Extent2D::new(2, 2));

    let complete = device.validate_framebuffer(&FramebufferDescriptor {
        label: None,
        color_attachments: &[small],
        depth_attachment: Some(depth),
    });
    assert!(complete.is_complete());

    let mixed_sizes = device.validate_framebuffer(&FramebufferDescriptor {
        label: None,
        color_attachments: &[small, large],
        depth_attachment: None,
    });
    assert!(!mixed_sizes.is_complete());

    let depth_as_color = device.validate_framebuffer(&FramebufferDescriptor {
        label: None,
        color_attachments: &[depth],
        depth_attachment: None,
    });
    assert!(!depth_as_color.is_complete());
}

#[test]
fn test_buffers_and_counts() {
    let device = HeadlessDevice::new();
    let buffer = device
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 8,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })
        .unwrap();
    device.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(device.buffer_contents(buffer), Some(vec![0, 0, 0, 0, 1, 2, 3, 4]));
    assert!(matches!(
        device.write_buffer(buffer, 6, &[0; 4]),
        Err(ResourceError::OutOfBounds)
    ));

    assert_eq!(device.resource_counts().buffers, 1);
    device.destroy_buffer(buffer).unwrap();
    assert_eq!(device.resource_counts().buffers, 0);
    assert!(device.destroy_buffer(buffer).is_err());
}

#[test]
fn test_compile_errors_carry_the_program_name() {
    let device = HeadlessDevice::new();
    let err = device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some("lighting"),
            source: Cow::Borrowed("#error missing include\n"),
        })
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("lighting"), "{message}");
    assert!(message.contains("missing include"), "{message}");
}
