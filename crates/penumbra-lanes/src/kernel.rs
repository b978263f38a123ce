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

//! Sample kernel and rotation noise for screen-space ambient occlusion.

use penumbra_core::math::{Vec3, Vec4};
use penumbra_core::SsaoSettings;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hemisphere samples and per-pixel rotation vectors, generated from a seed.
#[derive(Debug, Clone, PartialEq)]
pub struct SsaoKernel {
    /// Tangent-space samples in the +Z hemisphere, denser near the origin.
    pub samples: Vec<Vec3>,
    /// Rotation vectors around +Z, `noise_dimension²` of them.
    pub noise: Vec<Vec3>,
    /// Side of the square noise texture.
    pub noise_dimension: u32,
}

impl SsaoKernel {
    /// Generates the kernel deterministically from `settings.seed`.
    pub fn generate(settings: &SsaoSettings) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        let count = settings.kernel_size.max(1);

        let samples = (0..count)
            .map(|i| {
                let direction = Vec3::new(
                    rng.gen_range(-1.0f32..1.0),
                    rng.gen_range(-1.0f32..1.0),
                    rng.gen_range(0.0f32..1.0),
                )
                .normalize();
                let t = i as f32 / count as f32;
                let scale = 0.1 + 0.9 * t * t;
                direction * rng.gen::<f32>() * scale
            })
            .collect();

        let noise_dimension = settings.noise_dimension.max(1);
        let noise = (0..noise_dimension * noise_dimension)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-1.0f32..1.0),
                    rng.gen_range(-1.0f32..1.0),
                    0.0,
                )
            })
            .collect();

        Self {
            samples,
            noise,
            noise_dimension,
        }
    }

    /// The samples as a std140 `vec3[]` (16-byte stride).
    pub fn sample_bytes(&self) -> Vec<u8> {
        let padded: Vec<Vec4> = self
            .samples
            .iter()
            .map(|s| Vec4::from_vec3(*s, 0.0))
            .collect();
        bytemuck::cast_slice(&padded).to_vec()
    }

    /// The noise vectors encoded as RGBA8 texels, `v * 0.5 + 0.5`.
    pub fn noise_rgba8(&self) -> Vec<u8> {
        let encode = |c: f32| ((c * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
        self.noise
            .iter()
            .flat_map(|n| [encode(n.x), encode(n.y), encode(n.z), 255])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_deterministic() {
        let settings = SsaoSettings::default();
        assert_eq!(SsaoKernel::generate(&settings), SsaoKernel::generate(&settings));

        let other = SsaoSettings {
            seed: settings.seed + 1,
            ..settings
        };
        assert_ne!(SsaoKernel::generate(&settings), SsaoKernel::generate(&other));
    }

    #[test]
    fn test_kernel_shape() {
        let kernel = SsaoKernel::generate(&SsaoSettings::default());
        assert_eq!(kernel.samples.len(), 64);
        assert_eq!(kernel.noise.len(), 16);
        for s in &kernel.samples {
            assert!(s.z >= 0.0, "sample below the hemisphere: {s:?}");
            assert!(s.length() <= 1.0 + 1e-5);
        }
        for n in &kernel.noise {
            assert_eq!(n.z, 0.0);
        }
    }

    #[test]
    fn test_encodings() {
        let kernel = SsaoKernel::generate(&SsaoSettings::default());
        assert_eq!(kernel.sample_bytes().len(), 64 * 16);
        assert_eq!(kernel.noise_rgba8().len(), 16 * 4);
    }
}
