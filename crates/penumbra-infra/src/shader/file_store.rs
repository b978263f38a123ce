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

//! A program store compiling sources from memory or disk, with hot reload.

use penumbra_core::renderer::{
    GraphicsDevice, ProgramId, ProgramReload, ProgramSource, ResourceError, ShaderError,
    ShaderModuleDescriptor, ShaderModuleId, ShaderProgramStore,
};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug)]
enum StoredSource {
    Inline,
    File {
        path: PathBuf,
        modified: Option<SystemTime>,
    },
}

#[derive(Debug)]
struct ProgramEntry {
    name: String,
    source: StoredSource,
    module: ShaderModuleId,
    rebuilt: bool,
}

/// Owns compiled programs. File-backed programs are recompiled when their
/// modification time changes.
#[derive(Debug, Default)]
pub struct FileProgramStore {
    programs: Vec<ProgramEntry>,
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|e| ShaderError::LoadError {
        path: path.display().to_string(),
        source_error: e.to_string(),
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn compile(
    device: &dyn GraphicsDevice,
    name: &str,
    source: &str,
) -> Result<ShaderModuleId, ShaderError> {
    device
        .create_shader_module(&ShaderModuleDescriptor {
            label: Some(name),
            source: Cow::Borrowed(source),
        })
        .map_err(|e| match e {
            ResourceError::Shader(shader) => shader,
            other => ShaderError::CompilationError {
                label: name.to_string(),
                details: other.to_string(),
            },
        })
}

impl FileProgramStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns `true` if no program is registered.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// The name a program was registered under.
    pub fn name(&self, id: ProgramId) -> Option<&str> {
        self.programs.get(id.0).map(|p| p.name.as_str())
    }

    /// Destroys every compiled module.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        for program in self.programs {
            if let Err(e) = device.destroy_shader_module(program.module) {
                log::warn!("Failed to destroy program '{}': {e}", program.name);
            }
        }
    }

    fn reload(
        device: &dyn GraphicsDevice,
        program: &mut ProgramEntry,
    ) -> Result<Option<ShaderModuleId>, ShaderError> {
        let StoredSource::File { path, modified: seen } = &mut program.source else {
            return Ok(None);
        };
        let current = modified(path);
        if current.is_none() || current == *seen {
            return Ok(None);
        }
        *seen = current;

        let source = read_source(path)?;
        let module = compile(device, &program.name, &source)?;
        Ok(Some(module))
    }
}

impl ShaderProgramStore for FileProgramStore {
    fn register(
        &mut self,
        device: &dyn GraphicsDevice,
        name: &str,
        source: ProgramSource<'_>,
    ) -> Result<ProgramId, ShaderError> {
        let (module, stored) = match source {
            ProgramSource::Inline(text) => (compile(device, name, &text)?, StoredSource::Inline),
            ProgramSource::File(path) => {
                let text = read_source(&path)?;
                let module = compile(device, name, &text)?;
                let modified = modified(&path);
                log::info!("Watching program '{name}' at {}", path.display());
                (module, StoredSource::File { path, modified })
            }
        };

        let id = ProgramId(self.programs.len());
        self.programs.push(ProgramEntry {
            name: name.to_string(),
            source: stored,
            module,
            rebuilt: false,
        });
        log::debug!("Registered program '{name}' as {id:?} ({module:?})");
        Ok(id)
    }

    fn program(&self, id: ProgramId) -> Option<ShaderModuleId> {
        self.programs.get(id.0).map(|p| p.module)
    }

    fn was_rebuilt(&self, id: ProgramId) -> bool {
        self.programs.get(id.0).is_some_and(|p| p.rebuilt)
    }

    fn poll_reloads(&mut self, device: &dyn GraphicsDevice) -> Vec<ProgramReload> {
        let mut reloads = Vec::new();
        for (index, program) in self.programs.iter_mut().enumerate() {
            program.rebuilt = false;
            match Self::reload(device, program) {
                Ok(Some(new)) => {
                    let old = std::mem::replace(&mut program.module, new);
                    if let Err(e) = device.destroy_shader_module(old) {
                        log::warn!("Failed to destroy replaced program '{}': {e}", program.name);
                    }
                    program.rebuilt = true;
                    log::info!("Reloaded program '{}'", program.name);
                    reloads.push(ProgramReload {
                        program: ProgramId(index),
                        old,
                        new,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!(
                        "Failed to reload program '{}', keeping the previous version: {e}",
                        program.name
                    );
                }
            }
        }
        reloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::HeadlessDevice;
    use std::fs::File;
    use std::time::Duration;

    const GOOD: &str = "#ifdef VERTEX\nlayout(location = 0) in vec3 aPosition;\n#endif\n";
    const ALSO_GOOD: &str =
        "#ifdef VERTEX\nlayout(location = 0) in vec3 aPosition;\nlayout(location = 1) in vec2 aUv;\n#endif\n";

    fn touch(path: &Path, contents: &str, seconds_ahead: u64) {
        fs::write(path, contents).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(seconds_ahead))
            .unwrap();
    }

    #[test]
    fn test_inline_program_never_reloads() {
        let device = HeadlessDevice::new();
        let mut store = FileProgramStore::new();
        let id = store
            .register(&device, "inline", ProgramSource::Inline(Cow::Borrowed(GOOD)))
            .unwrap();
        assert!(store.program(id).is_some());
        assert!(store.poll_reloads(&device).is_empty());
        assert!(!store.was_rebuilt(id));
        assert_eq!(store.name(id), Some("inline"));
    }

    #[test]
    fn test_changed_file_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program.glsl");
        touch(&path, GOOD, 0);

        let device = HeadlessDevice::new();
        let mut store = FileProgramStore::new();
        let id = store
            .register(&device, "program", ProgramSource::File(path.clone()))
            .unwrap();
        let before = store.program(id).unwrap();
        assert!(store.poll_reloads(&device).is_empty());

        touch(&path, ALSO_GOOD, 10);
        let reloads = store.poll_reloads(&device);
        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].old, before);
        assert_ne!(reloads[0].new, before);
        assert!(store.was_rebuilt(id));
        assert_eq!(store.program(id), Some(reloads[0].new));
        assert!(device.shader_label(before).is_none(), "old module destroyed");

        assert!(store.poll_reloads(&device).is_empty());
        assert!(!store.was_rebuilt(id));
    }

    #[test]
    fn test_failed_recompile_keeps_previous_program() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program.glsl");
        touch(&path, GOOD, 0);

        let device = HeadlessDevice::new();
        let mut store = FileProgramStore::new();
        let id = store
            .register(&device, "program", ProgramSource::File(path.clone()))
            .unwrap();
        let before = store.program(id).unwrap();

        touch(&path, "#error half-saved file\n", 10);
        assert!(store.poll_reloads(&device).is_empty());
        assert!(!store.was_rebuilt(id));
        assert_eq!(store.program(id), Some(before));
        assert!(device.shader_label(before).is_some());
    }

    #[test]
    fn test_register_reports_load_and_compile_errors() {
        let device = HeadlessDevice::new();
        let mut store = FileProgramStore::new();
        let missing = store.register(
            &device,
            "missing",
            ProgramSource::File(PathBuf::from("/definitely/not/here.glsl")),
        );
        assert!(matches!(missing, Err(ShaderError::LoadError { .. })));

        let broken = store.register(&device, "broken", ProgramSource::Inline(Cow::Borrowed("")));
        assert!(matches!(
            broken,
            Err(ShaderError::CompilationError { ref label, .. }) if label == "broken"
        ));
        assert!(store.is_empty());
    }
}
