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

//! Built-in shader programs of the frame pipeline.
//!
//! Each program is one GLSL file holding both stages: the vertex stage is
//! guarded by `VERTEX` and the fragment stage by `FRAGMENT`. Programs are
//! registered in the [`ShaderProgramStore`](penumbra_core::renderer::ShaderProgramStore)
//! under [`BuiltinProgram::name`]; when a shader directory is configured, a
//! file `<name>.glsl` in it replaces the embedded source and is hot reloaded.

use penumbra_core::renderer::ProgramSource;
use std::borrow::Cow;
use std::path::Path;

/// A program used by one of the lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinProgram {
    /// Depth-only pre-pass.
    DepthPrePass,
    /// G-buffer fill.
    Geometry,
    /// Ambient occlusion.
    Ssao,
    /// Ambient occlusion blur.
    SsaoBlur,
    /// Light volumes.
    Lighting,
    /// Attachment presentation.
    Composite,
}

impl BuiltinProgram {
    /// Every built-in program.
    pub const ALL: [BuiltinProgram; 6] = [
        BuiltinProgram::DepthPrePass,
        BuiltinProgram::Geometry,
        BuiltinProgram::Ssao,
        BuiltinProgram::SsaoBlur,
        BuiltinProgram::Lighting,
        BuiltinProgram::Composite,
    ];

    /// Program name, also the file stem in a shader directory.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinProgram::DepthPrePass => "depth_prepass",
            BuiltinProgram::Geometry => "geometry",
            BuiltinProgram::Ssao => "ssao",
            BuiltinProgram::SsaoBlur => "ssao_blur",
            BuiltinProgram::Lighting => "lighting",
            BuiltinProgram::Composite => "composite",
        }
    }

    /// The embedded GLSL source.
    pub fn embedded_source(self) -> &'static str {
        match self {
            BuiltinProgram::DepthPrePass => include_str!("depth_prepass.glsl"),
            BuiltinProgram::Geometry => include_str!("geometry.glsl"),
            BuiltinProgram::Ssao => include_str!("ssao.glsl"),
            BuiltinProgram::SsaoBlur => include_str!("ssao_blur.glsl"),
            BuiltinProgram::Lighting => include_str!("lighting.glsl"),
            BuiltinProgram::Composite => include_str!("composite.glsl"),
        }
    }

    /// The source to register: `<dir>/<name>.glsl` if it exists, the embedded source otherwise.
    pub fn source(self, shader_dir: Option<&Path>) -> ProgramSource<'static> {
        if let Some(dir) = shader_dir {
            let path = dir.join(format!("{}.glsl", self.name()));
            if path.is_file() {
                return ProgramSource::File(path);
            }
            log::debug!(
                "No override for '{}' in {}, using the embedded source",
                self.name(),
                dir.display()
            );
        }
        ProgramSource::Inline(Cow::Borrowed(self.embedded_source()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use penumbra_core::renderer::constant::layout::MAX_LIGHTS;

    #[test]
    fn test_sources_declare_both_stages() {
        for program in BuiltinProgram::ALL {
            let source = program.embedded_source();
            assert!(source.starts_with("#version 450"), "{}", program.name());
            assert!(source.contains("#ifdef VERTEX"), "{}", program.name());
            assert!(source.contains("#ifdef FRAGMENT"), "{}", program.name());
        }
    }

    #[test]
    fn test_lighting_light_array_matches_global_block() {
        let source = BuiltinProgram::Lighting.embedded_source();
        let declared = source
            .lines()
            .find_map(|line| line.trim().strip_prefix("#define MAX_LIGHTS "))
            .and_then(|n| n.trim().parse::<usize>().ok());
        assert_eq!(declared, Some(MAX_LIGHTS));
        assert!(source.contains("Light uLight[MAX_LIGHTS];"));
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let source = BuiltinProgram::Lighting.source(Some(Path::new("/nonexistent/shaders")));
        assert!(matches!(source, ProgramSource::Inline(_)));
    }
}
