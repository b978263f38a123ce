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

//! Integer extents for textures and viewports.

use serde::{Deserialize, Serialize};

/// A 2D extent, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width.
    pub width: u32,
    /// The height.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns this extent with each dimension raised to at least 1.
    pub fn clamped_to_min(self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }

    /// Returns `true` if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height. Returns 1.0 for an empty extent.
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// The number of texels covered by this extent.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A 3D extent, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width.
    pub width: u32,
    /// The height.
    pub height: u32,
    /// The depth or array layer count.
    pub depth_or_array_layers: u32,
}

impl From<Extent2D> for Extent3D {
    fn from(e: Extent2D) -> Self {
        Self {
            width: e.width,
            height: e.height,
            depth_or_array_layers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_to_min() {
        assert_eq!(Extent2D::new(0, 0).clamped_to_min(), Extent2D::new(1, 1));
        assert_eq!(Extent2D::new(640, 0).clamped_to_min(), Extent2D::new(640, 1));
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(Extent2D::new(1600, 800).aspect_ratio(), 2.0);
        assert_eq!(Extent2D::new(0, 800).aspect_ratio(), 1.0);
    }
}
