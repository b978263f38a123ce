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

//! The std140 constant blocks shared with the shaders.
//!
//! ```text
//! Global block (one per frame)          Local block (one per entity / light volume)
//!   @0   vec3 camera_position             @0   mat4 world
//!   @12  uint light_count                 @64  mat4 world_view_projection
//!   @16  Light lights[light_count]
//!
//! Light record (stride 64)
//!   @+0  uint type   @+16 vec3 color   @+32 vec3 direction   @+48 vec3 position
//! ```

use super::{ConstantRegion, ConstantRegionAllocator};
use crate::math::{Mat4, Vec3};
use crate::renderer::error::ConstantBufferError;
use crate::renderer::light::Light;

/// Offset of `camera_position` in the global block.
pub const GLOBAL_CAMERA_POSITION_OFFSET: u64 = 0;
/// Offset of `light_count` in the global block.
pub const GLOBAL_LIGHT_COUNT_OFFSET: u64 = 12;
/// Offset of the first light record in the global block.
pub const GLOBAL_LIGHTS_OFFSET: u64 = 16;
/// Distance between consecutive light records.
pub const LIGHT_RECORD_STRIDE: u64 = 64;
/// Length of the light array declared by the lighting shader.
pub const MAX_LIGHTS: usize = 256;
/// Alignment of a light record (`vec4`).
const LIGHT_RECORD_ALIGNMENT: u64 = 16;
/// Offset of `type` inside a light record.
pub const LIGHT_TYPE_OFFSET: u64 = 0;
/// Offset of `color` inside a light record.
pub const LIGHT_COLOR_OFFSET: u64 = 16;
/// Offset of `direction` inside a light record.
pub const LIGHT_DIRECTION_OFFSET: u64 = 32;
/// Offset of `position` inside a light record.
pub const LIGHT_POSITION_OFFSET: u64 = 48;

/// Offset of `world` in the local block.
pub const LOCAL_WORLD_OFFSET: u64 = 0;
/// Offset of `world_view_projection` in the local block.
pub const LOCAL_WORLD_VIEW_PROJECTION_OFFSET: u64 = 64;
/// Size of the local block.
pub const LOCAL_BLOCK_SIZE: u64 = 128;

/// Constant block slot of the global block.
pub const GLOBAL_BLOCK_SLOT: u32 = 0;
/// Constant block slot of the local block.
pub const LOCAL_BLOCK_SLOT: u32 = 1;

/// Size of a global block holding `light_count` lights.
pub fn global_block_size(light_count: usize) -> u64 {
    GLOBAL_LIGHTS_OFFSET + light_count as u64 * LIGHT_RECORD_STRIDE
}

/// Writes the global block for this frame.
///
/// Fails with [`ConstantBufferError::TooManyLights`] past [`MAX_LIGHTS`]
/// lights, before anything is allocated.
pub fn pack_global_block(
    allocator: &mut ConstantRegionAllocator,
    camera_position: Vec3,
    lights: &[Light],
) -> Result<ConstantRegion, ConstantBufferError> {
    if lights.len() > MAX_LIGHTS {
        return Err(ConstantBufferError::TooManyLights {
            count: lights.len(),
            max: MAX_LIGHTS,
        });
    }
    let light_count = lights.len() as u32;

    let mut block = allocator.block()?;
    block.push_vec3(camera_position)?;
    block.push_u32(light_count)?;

    for light in lights {
        block.align(LIGHT_RECORD_ALIGNMENT)?;
        debug_assert_eq!(
            (block.position() - GLOBAL_LIGHTS_OFFSET) % LIGHT_RECORD_STRIDE,
            0
        );
        block.push_u32(light.kind.code())?;
        block.push_vec3(light.color)?;
        block.push_vec3(light.direction)?;
        block.push_vec3(light.position)?;
    }
    block.align(LIGHT_RECORD_ALIGNMENT)?;

    let region = block.finish();
    debug_assert_eq!(region.size, global_block_size(lights.len()));
    Ok(region)
}

/// Writes one local block.
pub fn pack_local_block(
    allocator: &mut ConstantRegionAllocator,
    world: &Mat4,
    view_projection: &Mat4,
) -> Result<ConstantRegion, ConstantBufferError> {
    let mut block = allocator.block()?;
    block.push_mat4(world)?;
    block.push_mat4(&(*view_projection * *world))?;
    let region = block.finish();
    debug_assert_eq!(region.size, LOCAL_BLOCK_SIZE);
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::LinearRgba;
    use crate::renderer::api::DeviceLimits;
    use crate::renderer::light::LightKind;
    use crate::test_support::MockDevice;

    fn setup() -> (MockDevice, ConstantRegionAllocator) {
        let dev = MockDevice::with_limits(DeviceLimits {
            max_constant_block_size: 4096,
            min_constant_offset_alignment: 256,
            ..Default::default()
        });
        let alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        (dev, alloc)
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn read_vec3(bytes: &[u8], at: usize) -> Vec3 {
        bytemuck::pod_read_unaligned(&bytes[at..at + 12])
    }

    #[test]
    fn test_global_block_light_records_read_back_bit_exact() {
        let (dev, mut alloc) = setup();
        let camera = Vec3::new(0.5, 1.25, -3.0);
        let lights = [
            Light::directional(LinearRgba::WHITE, Vec3::new(0.0, -1.0, 0.0)),
            Light {
                kind: LightKind::Point,
                color: Vec3::new(0.1, 0.7, 0.3),
                direction: Vec3::new(0.0, 0.0, -1.0),
                position: Vec3::new(1.5, -2.25, 8.125),
            },
        ];

        alloc.begin_frame().unwrap();
        let region = pack_global_block(&mut alloc, camera, &lights).unwrap();
        alloc.end_frame(&dev).unwrap();

        assert_eq!(region.size, global_block_size(2));
        let contents = dev.buffer_contents(alloc.buffer());
        let block = &contents[region.offset as usize..region.end() as usize];

        assert_eq!(read_vec3(block, GLOBAL_CAMERA_POSITION_OFFSET as usize), camera);
        assert_eq!(read_u32(block, GLOBAL_LIGHT_COUNT_OFFSET as usize), 2);
        for (i, light) in lights.iter().enumerate() {
            let base = (GLOBAL_LIGHTS_OFFSET + i as u64 * LIGHT_RECORD_STRIDE) as usize;
            assert_eq!(read_u32(block, base + LIGHT_TYPE_OFFSET as usize), light.kind.code());
            let color = read_vec3(block, base + LIGHT_COLOR_OFFSET as usize);
            let direction = read_vec3(block, base + LIGHT_DIRECTION_OFFSET as usize);
            let position = read_vec3(block, base + LIGHT_POSITION_OFFSET as usize);
            assert_eq!(color.to_array().map(f32::to_bits), light.color.to_array().map(f32::to_bits));
            assert_eq!(direction, light.direction);
            assert_eq!(position, light.position);
        }
    }

    #[test]
    fn test_empty_global_block() {
        let (dev, mut alloc) = setup();
        alloc.begin_frame().unwrap();
        let region = pack_global_block(&mut alloc, Vec3::ZERO, &[]).unwrap();
        alloc.end_frame(&dev).unwrap();
        assert_eq!(region.size, GLOBAL_LIGHTS_OFFSET);
        let contents = dev.buffer_contents(alloc.buffer());
        assert_eq!(read_u32(&contents, 12), 0);
    }

    #[test]
    fn test_local_block_layout() {
        let (dev, mut alloc) = setup();
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let view_projection = Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));

        alloc.begin_frame().unwrap();
        let global = pack_global_block(&mut alloc, Vec3::ZERO, &[]).unwrap();
        let local = pack_local_block(&mut alloc, &world, &view_projection).unwrap();
        alloc.end_frame(&dev).unwrap();

        assert!(!global.overlaps(&local));
        assert_eq!(local.offset % 256, 0);
        assert_eq!(local.size, LOCAL_BLOCK_SIZE);

        let contents = dev.buffer_contents(alloc.buffer());
        let world_at = (local.offset + LOCAL_WORLD_OFFSET) as usize;
        let wvp_at = (local.offset + LOCAL_WORLD_VIEW_PROJECTION_OFFSET) as usize;
        let stored_world: Mat4 = bytemuck::pod_read_unaligned(&contents[world_at..world_at + 64]);
        let stored_wvp: Mat4 = bytemuck::pod_read_unaligned(&contents[wvp_at..wvp_at + 64]);
        assert_eq!(stored_world, world);
        assert_eq!(stored_wvp, view_projection * world);
    }

    #[test]
    fn test_too_many_lights_overflow() {
        let dev = MockDevice::with_limits(DeviceLimits {
            max_constant_block_size: 256,
            min_constant_offset_alignment: 256,
            ..Default::default()
        });
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        let lights = vec![Light::point(LinearRgba::WHITE, Vec3::ZERO); 4];
        alloc.begin_frame().unwrap();
        assert!(matches!(
            pack_global_block(&mut alloc, Vec3::ZERO, &lights),
            Err(ConstantBufferError::Overflow { .. })
        ));
    }

    #[test]
    fn test_light_array_capacity_is_enforced() {
        let (dev, mut alloc) = setup_large();
        let sun = Light::directional(LinearRgba::WHITE, Vec3::new(0.0, -1.0, 0.0));

        alloc.begin_frame().unwrap();
        let full = vec![sun; MAX_LIGHTS];
        let region = pack_global_block(&mut alloc, Vec3::ZERO, &full).unwrap();
        assert_eq!(region.size, global_block_size(MAX_LIGHTS));

        let head = alloc.head();
        let over = vec![sun; MAX_LIGHTS + 1];
        assert_eq!(
            pack_global_block(&mut alloc, Vec3::ZERO, &over),
            Err(ConstantBufferError::TooManyLights {
                count: MAX_LIGHTS + 1,
                max: MAX_LIGHTS,
            })
        );
        assert_eq!(alloc.head(), head, "nothing allocated");
        alloc.end_frame(&dev).unwrap();
    }

    fn setup_large() -> (MockDevice, ConstantRegionAllocator) {
        let dev = MockDevice::with_limits(DeviceLimits::default());
        let alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        (dev, alloc)
    }
}
