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

use crate::math::{Extent2D, Mat4, Vec3, FRAC_PI_4};

/// A perspective camera looking from `position` at `target`, with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near clip distance.
    pub z_near: f32,
    /// Far clip distance.
    pub z_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov_y: FRAC_PI_4,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }
}

impl Camera {
    /// Creates a camera with the default projection parameters.
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    /// The world-to-view matrix.
    ///
    /// Looking straight up or down switches the up vector to +Z. A camera whose
    /// target equals its position gets the identity view.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
            .or_else(|| Mat4::look_at_rh(self.position, self.target, Vec3::Z))
            .unwrap_or(Mat4::IDENTITY)
    }

    /// The view-to-clip matrix for a viewport.
    pub fn projection(&self, viewport: Extent2D) -> Mat4 {
        Mat4::perspective_rh_zo(self.fov_y, viewport.aspect_ratio(), self.z_near, self.z_far)
    }

    /// `projection * view`.
    pub fn view_projection(&self, viewport: Extent2D) -> Mat4 {
        self.projection(viewport) * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec4;

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::new(Vec3::new(3.0, 2.0, 6.0), Vec3::new(0.0, 1.0, 0.0));
        let clip = camera.view_projection(Extent2D::new(1280, 720)) * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn test_degenerate_views() {
        let down = Camera::new(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        assert_ne!(down.view(), Mat4::IDENTITY);

        let same = Camera::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(same.view(), Mat4::IDENTITY);
    }
}
