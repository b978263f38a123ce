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

//! Materials and the texture table.

use crate::math::{Extent2D, LinearRgba};
use crate::renderer::api::{
    TextureDescriptor, TextureFormat, TextureId, TextureUsage, TextureViewDescriptor,
    TextureViewId,
};
use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use ahash::AHashMap;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Surface parameters of a submesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Base color, multiplied with the albedo texture.
    pub albedo: LinearRgba,
    /// Emitted color.
    pub emissive: LinearRgba,
    /// Smoothness in `[0, 1]`, stored in the albedo attachment's alpha.
    pub smoothness: f32,
    /// Texture index of the albedo map.
    pub albedo_texture: Option<usize>,
    /// Texture index of the emissive map.
    pub emissive_texture: Option<usize>,
    /// Texture index of the specular map.
    pub specular_texture: Option<usize>,
    /// Texture index of the normal map.
    pub normal_texture: Option<usize>,
    /// Texture index of the bump map.
    pub bump_texture: Option<usize>,
}

impl Material {
    /// An untextured material.
    pub fn new(name: impl Into<String>, albedo: LinearRgba) -> Self {
        Self {
            name: name.into(),
            albedo,
            emissive: LinearRgba::BLACK,
            smoothness: 0.0,
            albedo_texture: None,
            emissive_texture: None,
            specular_texture: None,
            normal_texture: None,
            bump_texture: None,
        }
    }

    /// The texture index bound to `slot`.
    pub fn texture(&self, slot: TextureSlot) -> Option<usize> {
        match slot {
            TextureSlot::Albedo => self.albedo_texture,
            TextureSlot::Emissive => self.emissive_texture,
            TextureSlot::Specular => self.specular_texture,
            TextureSlot::Normal => self.normal_texture,
            TextureSlot::Bump => self.bump_texture,
        }
    }
}

/// The texture slots of a material, in shader binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Base color.
    Albedo,
    /// Emission.
    Emissive,
    /// Specular intensity.
    Specular,
    /// Tangent-space normals.
    Normal,
    /// Height.
    Bump,
}

impl TextureSlot {
    /// Every slot, in binding order.
    pub const ALL: [TextureSlot; 5] = [
        TextureSlot::Albedo,
        TextureSlot::Emissive,
        TextureSlot::Specular,
        TextureSlot::Normal,
        TextureSlot::Bump,
    ];

    /// The placeholder used when the material has no texture in this slot.
    pub fn default_placeholder(self) -> Placeholder {
        match self {
            TextureSlot::Albedo => Placeholder::White,
            TextureSlot::Normal => Placeholder::Normal,
            TextureSlot::Emissive | TextureSlot::Specular | TextureSlot::Bump => Placeholder::Black,
        }
    }

    /// The placeholder used when the material references a texture that does not exist.
    pub fn missing_placeholder(self) -> Placeholder {
        match self {
            TextureSlot::Albedo => Placeholder::Magenta,
            other => other.default_placeholder(),
        }
    }
}

/// The 1x1 textures created with every texture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Placeholder {
    /// Opaque white.
    White,
    /// Opaque black.
    Black,
    /// A flat tangent-space normal.
    Normal,
    /// Magenta, marks a missing albedo texture.
    Magenta,
}

impl Placeholder {
    const ALL: [Placeholder; 4] = [
        Placeholder::White,
        Placeholder::Black,
        Placeholder::Normal,
        Placeholder::Magenta,
    ];

    /// The texel color of the placeholder.
    pub fn color(self) -> LinearRgba {
        match self {
            Placeholder::White => LinearRgba::WHITE,
            Placeholder::Black => LinearRgba::BLACK,
            Placeholder::Normal => LinearRgba::new(0.5, 0.5, 1.0, 1.0),
            Placeholder::Magenta => LinearRgba::MAGENTA,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Placeholder::White => "White",
            Placeholder::Black => "Black",
            Placeholder::Normal => "Normal",
            Placeholder::Magenta => "Magenta",
        }
    }
}

/// A sampled texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// The texture.
    pub id: TextureId,
    /// The view bound to shaders.
    pub view: TextureViewId,
    /// Size in texels.
    pub size: Extent2D,
    /// The file this texture was decoded from, if any.
    pub path: Option<PathBuf>,
}

/// Arena of textures, de-duplicated by source path, with placeholder textures.
#[derive(Debug)]
pub struct TextureTable {
    textures: Vec<Texture>,
    by_path: AHashMap<PathBuf, usize>,
    placeholders: [usize; 4],
}

impl TextureTable {
    /// Creates the table and its placeholder textures.
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let mut table = Self {
            textures: Vec::new(),
            by_path: AHashMap::new(),
            placeholders: [0; 4],
        };
        for (slot, placeholder) in Placeholder::ALL.into_iter().enumerate() {
            let texel = placeholder.color().to_rgba8();
            let label = format!("{} Placeholder", placeholder.name());
            table.placeholders[slot] =
                table.upload(device, &label, None, Extent2D::new(1, 1), &texel)?;
        }
        Ok(table)
    }

    /// Uploads an RGBA8 texture and returns its index.
    ///
    /// A texture with a `path` already present in the table is not uploaded
    /// again; the existing index is returned.
    pub fn add_rgba8(
        &mut self,
        device: &dyn GraphicsDevice,
        path: Option<&Path>,
        size: Extent2D,
        pixels: &[u8],
    ) -> Result<usize, ResourceError> {
        if let Some(p) = path {
            if let Some(index) = self.index_of_path(p) {
                log::debug!("Texture '{}' already loaded at index {index}", p.display());
                return Ok(index);
            }
        }
        let expected = size.area() * 4;
        if pixels.len() != expected {
            return Err(ResourceError::BackendError(format!(
                "RGBA8 texture of {}x{} needs {expected} bytes, got {}",
                size.width,
                size.height,
                pixels.len()
            )));
        }
        let label = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Texture".to_string());
        self.upload(device, &label, path, size, pixels)
    }

    fn upload(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        path: Option<&Path>,
        size: Extent2D,
        pixels: &[u8],
    ) -> Result<usize, ResourceError> {
        let id = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed(label)),
            size,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;
        device.write_texture(id, pixels)?;
        let view = device.create_texture_view(
            id,
            &TextureViewDescriptor {
                label: Some(Cow::Borrowed(label)),
            },
        )?;

        let index = self.textures.len();
        self.textures.push(Texture {
            id,
            view,
            size,
            path: path.map(Path::to_path_buf),
        });
        if let Some(p) = path {
            self.by_path.insert(p.to_path_buf(), index);
        }
        Ok(index)
    }

    /// The index of the texture loaded from `path`.
    pub fn index_of_path(&self, path: &Path) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// The texture at `index`.
    pub fn get(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index)
    }

    /// A placeholder texture.
    pub fn placeholder(&self, placeholder: Placeholder) -> &Texture {
        &self.textures[self.placeholders[placeholder as usize]]
    }

    /// The texture a material binds in `slot`, falling back to a placeholder.
    pub fn resolve(&self, material: &Material, slot: TextureSlot) -> &Texture {
        match material.texture(slot) {
            None => self.placeholder(slot.default_placeholder()),
            Some(index) => match self.textures.get(index) {
                Some(texture) => texture,
                None => {
                    log::warn!(
                        "Material '{}' references missing {slot:?} texture {index}, using placeholder",
                        material.name
                    );
                    self.placeholder(slot.missing_placeholder())
                }
            },
        }
    }

    /// Number of textures, placeholders included.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Always `false`: the placeholders are created with the table.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroys every texture and view.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        for texture in self.textures {
            if let Err(e) = device.destroy_texture_view(texture.view) {
                log::warn!("Failed to destroy texture view {:?}: {e}", texture.view);
            }
            if let Err(e) = device.destroy_texture(texture.id) {
                log::warn!("Failed to destroy texture {:?}: {e}", texture.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockDevice;

    #[test]
    fn test_placeholders_exist() {
        let dev = MockDevice::default();
        let table = TextureTable::new(&dev).unwrap();
        assert_eq!(table.len(), 4);
        assert_ne!(
            table.placeholder(Placeholder::White).id,
            table.placeholder(Placeholder::Magenta).id
        );
    }

    #[test]
    fn test_textures_are_deduplicated_by_path() {
        let dev = MockDevice::default();
        let mut table = TextureTable::new(&dev).unwrap();
        let path = Path::new("textures/brick.png");
        let pixels = [200u8; 16];
        let a = table
            .add_rgba8(&dev, Some(path), Extent2D::new(2, 2), &pixels)
            .unwrap();
        let b = table
            .add_rgba8(&dev, Some(path), Extent2D::new(2, 2), &pixels)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 5);
        assert_eq!(table.index_of_path(path), Some(a));
    }

    #[test]
    fn test_wrong_pixel_count_is_rejected() {
        let dev = MockDevice::default();
        let mut table = TextureTable::new(&dev).unwrap();
        assert!(table
            .add_rgba8(&dev, None, Extent2D::new(2, 2), &[0; 3])
            .is_err());
    }

    #[test]
    fn test_missing_textures_fall_back_to_placeholders() {
        let dev = MockDevice::default();
        let table = TextureTable::new(&dev).unwrap();

        let mut material = Material::new("broken", LinearRgba::WHITE);
        assert_eq!(
            table.resolve(&material, TextureSlot::Albedo),
            table.placeholder(Placeholder::White)
        );
        assert_eq!(
            table.resolve(&material, TextureSlot::Normal),
            table.placeholder(Placeholder::Normal)
        );

        material.albedo_texture = Some(99);
        material.emissive_texture = Some(99);
        assert_eq!(
            table.resolve(&material, TextureSlot::Albedo),
            table.placeholder(Placeholder::Magenta)
        );
        assert_eq!(
            table.resolve(&material, TextureSlot::Emissive),
            table.placeholder(Placeholder::Black)
        );
    }
}
