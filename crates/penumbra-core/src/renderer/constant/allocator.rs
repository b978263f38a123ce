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

//! Bump allocator over a single constant buffer.
//!
//! ```text
//! begin_frame ─► allocate / write / block ... ─► end_frame(device)
//!      head = 0                                   flush [0, head) to the GPU
//! ```
//!
//! Writes go to a CPU staging copy that stands in for the mapped view. The
//! staging copy is only writable between `begin_frame` and `end_frame`, and
//! the exclusive `&mut` borrow of the allocator is what makes the session
//! exclusive.

use crate::math::{align_up, Mat4, Vec3};
use crate::renderer::api::{BufferDescriptor, BufferId, BufferUsage};
use crate::renderer::error::{ConstantBufferError, RenderError, ResourceError};
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;

/// A byte range inside the constant buffer, valid for the frame that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConstantRegion {
    /// Byte offset from the start of the buffer.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
}

impl ConstantRegion {
    /// One past the last byte of the region.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Returns `true` if the two regions share at least one byte.
    pub fn overlaps(&self, other: &ConstantRegion) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// The two alignment tiers of constant data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentPolicy {
    /// Alignment of every region start, the device's minimum constant offset alignment.
    pub region_alignment: u64,
    /// Alignment of `vec3`/`vec4`/`mat4` fields inside a block (std140).
    pub field_alignment: u64,
}

impl AlignmentPolicy {
    /// The std140 alignment of a `vec4`.
    pub const STD140_VEC4: u64 = 16;

    /// A policy with the given region alignment and std140 field alignment.
    pub fn new(region_alignment: u64) -> Self {
        Self {
            region_alignment,
            field_alignment: Self::STD140_VEC4,
        }
    }
}

/// Hands out aligned regions of one constant buffer, reset every frame.
#[derive(Debug)]
pub struct ConstantRegionAllocator {
    buffer: BufferId,
    capacity: u64,
    head: u64,
    policy: AlignmentPolicy,
    staging: Vec<u8>,
    mapped: bool,
}

impl ConstantRegionAllocator {
    /// Creates the constant buffer.
    ///
    /// The capacity is the device's maximum constant block size, lowered to
    /// `capacity_cap` when one is given.
    pub fn new(device: &dyn GraphicsDevice, capacity_cap: Option<u64>) -> Result<Self, ResourceError> {
        let limits = device.limits();
        let capacity = match capacity_cap {
            Some(cap) => cap.min(limits.max_constant_block_size),
            None => limits.max_constant_block_size,
        };
        let region_alignment = limits.min_constant_offset_alignment.max(1);
        if !region_alignment.is_power_of_two() {
            return Err(ResourceError::BackendError(format!(
                "device constant offset alignment {region_alignment} is not a power of two"
            )));
        }

        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("Constant Buffer")),
            size: capacity,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;

        log::info!(
            "Constant buffer created: {capacity} bytes, region alignment {region_alignment}"
        );

        Ok(Self {
            buffer,
            capacity,
            head: 0,
            policy: AlignmentPolicy::new(region_alignment),
            staging: vec![0; capacity as usize],
            mapped: false,
        })
    }

    /// The GPU buffer backing every region.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Total bytes available per frame.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes consumed so far in the current frame.
    pub fn head(&self) -> u64 {
        self.head
    }

    /// The alignment policy derived from the device limits.
    pub fn policy(&self) -> AlignmentPolicy {
        self.policy
    }

    /// Returns `true` between `begin_frame` and `end_frame`.
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Opens the mapped session and resets the head to zero.
    pub fn begin_frame(&mut self) -> Result<(), ConstantBufferError> {
        if self.mapped {
            return Err(ConstantBufferError::SessionAlreadyOpen);
        }
        self.mapped = true;
        self.head = 0;
        Ok(())
    }

    /// Reserves `size` bytes starting at the head aligned up to `alignment`.
    ///
    /// Never truncates: a request that does not fit fails and leaves the head untouched.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<ConstantRegion, ConstantBufferError> {
        if !self.mapped {
            return Err(ConstantBufferError::SessionNotOpen);
        }
        if !alignment.is_power_of_two() {
            return Err(ConstantBufferError::InvalidAlignment(alignment));
        }
        let offset = align_up(self.head, alignment);
        let end = offset.checked_add(size).filter(|&end| end <= self.capacity);
        let Some(end) = end else {
            return Err(ConstantBufferError::Overflow {
                requested: size,
                head: offset,
                capacity: self.capacity,
            });
        };
        self.head = end;
        debug_assert!(self.head <= self.capacity);
        Ok(ConstantRegion { offset, size })
    }

    /// Reserves a region aligned to the device's constant offset alignment.
    pub fn allocate_region(&mut self, size: u64) -> Result<ConstantRegion, ConstantBufferError> {
        self.allocate(size, self.policy.region_alignment)
    }

    /// Copies `bytes` into `region` at `offset`.
    pub fn write(
        &mut self,
        region: ConstantRegion,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), ConstantBufferError> {
        if !self.mapped {
            return Err(ConstantBufferError::SessionNotOpen);
        }
        let len = bytes.len() as u64;
        let out_of_region = ConstantBufferError::WriteOutOfRegion {
            region,
            offset,
            len,
        };
        let fits = offset.checked_add(len).is_some_and(|end| end <= region.size)
            && region.offset.checked_add(region.size).is_some_and(|end| end <= self.head);
        if !fits {
            return Err(out_of_region);
        }
        let start = (region.offset + offset) as usize;
        self.staging[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Starts a std140 block at the next region-aligned offset.
    ///
    /// The block grows as fields are pushed and becomes a region on
    /// [`BlockWriter::finish`].
    pub fn block(&mut self) -> Result<BlockWriter<'_>, ConstantBufferError> {
        let start = self.allocate(0, self.policy.region_alignment)?.offset;
        Ok(BlockWriter {
            allocator: self,
            start,
        })
    }

    /// Flushes `[0, head)` to the GPU buffer and closes the session.
    ///
    /// Returns the number of bytes flushed.
    pub fn end_frame(&mut self, device: &dyn GraphicsDevice) -> Result<u64, RenderError> {
        if !self.mapped {
            return Err(ConstantBufferError::SessionNotOpen.into());
        }
        self.mapped = false;
        if self.head > 0 {
            device.write_buffer(self.buffer, 0, &self.staging[..self.head as usize])?;
        }
        log::trace!("Constant buffer flushed {} / {} bytes", self.head, self.capacity);
        Ok(self.head)
    }

    /// Closes the session without flushing, after a failed frame.
    pub fn discard_frame(&mut self) {
        self.mapped = false;
        self.head = 0;
    }

    /// Destroys the GPU buffer.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        if let Err(e) = device.destroy_buffer(self.buffer) {
            log::warn!("Failed to destroy constant buffer: {e}");
        }
    }
}

/// Appends std140 fields to a block that starts at a region-aligned offset.
///
/// `u32` fields align to 4 bytes, `vec3` and `mat4` fields to the policy's
/// field alignment.
#[derive(Debug)]
pub struct BlockWriter<'a> {
    allocator: &'a mut ConstantRegionAllocator,
    start: u64,
}

impl BlockWriter<'_> {
    /// The current write position relative to the block start.
    pub fn position(&self) -> u64 {
        self.allocator.head - self.start
    }

    /// Aligns the write position to `alignment` bytes relative to the block start.
    pub fn align(&mut self, alignment: u64) -> Result<(), ConstantBufferError> {
        self.reserve(0, alignment).map(|_| ())
    }

    /// Appends a `uint`.
    pub fn push_u32(&mut self, value: u32) -> Result<u64, ConstantBufferError> {
        self.push_bytes(bytemuck::bytes_of(&value), 4)
    }

    /// Appends a `vec3`. Occupies 12 bytes; the next scalar may pack into the
    /// remaining 4.
    pub fn push_vec3(&mut self, value: Vec3) -> Result<u64, ConstantBufferError> {
        let alignment = self.allocator.policy.field_alignment;
        self.push_bytes(bytemuck::bytes_of(&value), alignment)
    }

    /// Appends a column-major `mat4`.
    pub fn push_mat4(&mut self, value: &Mat4) -> Result<u64, ConstantBufferError> {
        let alignment = self.allocator.policy.field_alignment;
        self.push_bytes(bytemuck::bytes_of(value), alignment)
    }

    /// Closes the block and returns its region.
    pub fn finish(self) -> ConstantRegion {
        ConstantRegion {
            offset: self.start,
            size: self.allocator.head - self.start,
        }
    }

    fn push_bytes(&mut self, bytes: &[u8], alignment: u64) -> Result<u64, ConstantBufferError> {
        let at = self.reserve(bytes.len() as u64, alignment)?;
        let start = at as usize;
        self.allocator.staging[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(at - self.start)
    }

    /// Reserves `size` bytes aligned relative to the block start. Returns the
    /// absolute offset.
    fn reserve(&mut self, size: u64, alignment: u64) -> Result<u64, ConstantBufferError> {
        if !alignment.is_power_of_two() {
            return Err(ConstantBufferError::InvalidAlignment(alignment));
        }
        let relative = align_up(self.position(), alignment);
        let at = self.start + relative;
        match at.checked_add(size) {
            Some(end) if end <= self.allocator.capacity => {
                self.allocator.head = end;
                Ok(at)
            }
            _ => Err(ConstantBufferError::Overflow {
                requested: size,
                head: at,
                capacity: self.allocator.capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::DeviceLimits;
    use crate::test_support::MockDevice;

    fn device(max: u64, alignment: u64) -> MockDevice {
        MockDevice::with_limits(DeviceLimits {
            max_constant_block_size: max,
            min_constant_offset_alignment: alignment,
            ..Default::default()
        })
    }

    #[test]
    fn test_capacity_comes_from_device_and_cap() {
        let dev = device(4096, 256);
        let alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        assert_eq!(alloc.capacity(), 4096);
        assert_eq!(alloc.policy(), AlignmentPolicy::new(256));

        let capped = ConstantRegionAllocator::new(&dev, Some(1024)).unwrap();
        assert_eq!(capped.capacity(), 1024);

        let not_raised = ConstantRegionAllocator::new(&dev, Some(1 << 20)).unwrap();
        assert_eq!(not_raised.capacity(), 4096);
    }

    #[test]
    fn test_regions_never_alias() {
        let dev = device(8192, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();

        let sizes = [16u64, 128, 1, 300, 64, 255, 256, 4];
        let regions: Vec<_> = sizes
            .iter()
            .map(|&s| alloc.allocate_region(s).unwrap())
            .collect();

        for (i, a) in regions.iter().enumerate() {
            assert_eq!(a.offset % 256, 0);
            for b in &regions[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
        assert!(alloc.head() <= alloc.capacity());
    }

    #[test]
    fn test_alignment_must_be_power_of_two() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        alloc.allocate(5, 1).unwrap();
        let r = alloc.allocate(8, 16).unwrap();
        assert_eq!(r.offset, 16);
        assert_eq!(
            alloc.allocate(8, 24),
            Err(ConstantBufferError::InvalidAlignment(24))
        );
    }

    #[test]
    fn test_head_resets_each_frame() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();

        alloc.begin_frame().unwrap();
        let first = alloc.allocate_region(100).unwrap();
        alloc.allocate_region(100).unwrap();
        alloc.end_frame(&dev).unwrap();

        alloc.begin_frame().unwrap();
        assert_eq!(alloc.head(), 0);
        let again = alloc.allocate_region(100).unwrap();
        assert_eq!(again, first);
        alloc.end_frame(&dev).unwrap();
    }

    #[test]
    fn test_overflow_is_rejected_without_truncation() {
        let dev = device(512, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        alloc.allocate_region(200).unwrap();
        let err = alloc.allocate_region(257).unwrap_err();
        assert_eq!(
            err,
            ConstantBufferError::Overflow {
                requested: 257,
                head: 256,
                capacity: 512
            }
        );
        assert_eq!(alloc.head(), 200);

        // Exactly filling the buffer is allowed.
        let last = alloc.allocate_region(256).unwrap();
        assert_eq!(last.end(), 512);
    }

    #[test]
    fn test_session_misuse() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        assert_eq!(
            alloc.allocate_region(4),
            Err(ConstantBufferError::SessionNotOpen)
        );
        alloc.begin_frame().unwrap();
        assert!(alloc.is_mapped());
        assert_eq!(
            alloc.begin_frame(),
            Err(ConstantBufferError::SessionAlreadyOpen)
        );
        alloc.end_frame(&dev).unwrap();
        assert!(!alloc.is_mapped());
        assert!(matches!(
            alloc.end_frame(&dev),
            Err(RenderError::ConstantBuffer(ConstantBufferError::SessionNotOpen))
        ));
        let region = ConstantRegion { offset: 0, size: 4 };
        assert_eq!(
            alloc.write(region, 0, &[1, 2, 3, 4]),
            Err(ConstantBufferError::SessionNotOpen)
        );
    }

    #[test]
    fn test_write_stays_inside_region() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        let region = alloc.allocate_region(8).unwrap();
        alloc.write(region, 4, &[9; 4]).unwrap();
        assert!(matches!(
            alloc.write(region, 6, &[9; 4]),
            Err(ConstantBufferError::WriteOutOfRegion { .. })
        ));
    }

    #[test]
    fn test_write_offset_overflow_is_rejected() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        let first = alloc.allocate_region(16).unwrap();
        let second = alloc.allocate_region(16).unwrap();
        alloc.write(first, 0, &[7; 16]).unwrap();

        for region in [first, second] {
            assert!(matches!(
                alloc.write(region, u64::MAX, &[0xAA, 0xBB]),
                Err(ConstantBufferError::WriteOutOfRegion { .. })
            ));
            assert!(matches!(
                alloc.write(region, u64::MAX - second.offset + 1, &[0xAA, 0xBB]),
                Err(ConstantBufferError::WriteOutOfRegion { .. })
            ));
        }
        alloc.end_frame(&dev).unwrap();
        assert_eq!(&dev.buffer_contents(alloc.buffer())[..16], &[7; 16]);
    }

    #[test]
    fn test_end_frame_flushes_written_prefix() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        alloc.allocate_region(4).unwrap();
        let region = alloc.allocate_region(4).unwrap();
        alloc.write(region, 0, &0xDEADBEEFu32.to_le_bytes()).unwrap();
        let flushed = alloc.end_frame(&dev).unwrap();
        assert_eq!(flushed, 260);

        let contents = dev.buffer_contents(alloc.buffer());
        assert_eq!(&contents[256..260], &0xDEADBEEFu32.to_le_bytes());
    }

    #[test]
    fn test_block_writer_std140_alignment() {
        let dev = device(1024, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        alloc.allocate_region(4).unwrap();

        let mut block = alloc.block().unwrap();
        assert_eq!(block.push_u32(1).unwrap(), 0);
        assert_eq!(block.push_vec3(Vec3::ONE).unwrap(), 16);
        assert_eq!(block.push_u32(2).unwrap(), 28);
        assert_eq!(block.push_mat4(&Mat4::IDENTITY).unwrap(), 32);
        block.align(16).unwrap();
        let region = block.finish();

        assert_eq!(region.offset, 256);
        assert_eq!(region.size, 96);
        assert_eq!(alloc.head(), 352);
    }

    #[test]
    fn test_block_overflow() {
        let dev = device(256 + 64, 256);
        let mut alloc = ConstantRegionAllocator::new(&dev, None).unwrap();
        alloc.begin_frame().unwrap();
        alloc.allocate_region(1).unwrap();
        let mut block = alloc.block().unwrap();
        block.push_mat4(&Mat4::IDENTITY).unwrap();
        assert!(matches!(
            block.push_u32(0),
            Err(ConstantBufferError::Overflow { .. })
        ));
    }
}
