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

use crate::renderer::api::ShaderModuleId;
use crate::renderer::error::ShaderError;
use crate::renderer::traits::GraphicsDevice;
use std::borrow::Cow;
use std::path::PathBuf;

/// A stable handle to a program registered in a [`ShaderProgramStore`].
///
/// Unlike a [`ShaderModuleId`], a `ProgramId` survives recompilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub usize);

/// Where the source of a program comes from.
#[derive(Debug, Clone)]
pub enum ProgramSource<'a> {
    /// Source text held in memory. Never reloaded.
    Inline(Cow<'a, str>),
    /// A file on disk, recompiled when its modification time changes.
    File(PathBuf),
}

/// A program that was recompiled by [`ShaderProgramStore::poll_reloads`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramReload {
    /// The program that changed.
    pub program: ProgramId,
    /// The module the program pointed to before the reload. It has been destroyed.
    pub old: ShaderModuleId,
    /// The freshly compiled module.
    pub new: ShaderModuleId,
}

/// Owns compiled shader programs and swaps them on hot reload.
pub trait ShaderProgramStore {
    /// Compiles and registers a program.
    ///
    /// ## Errors
    /// * `ShaderError` - If the source cannot be read or fails to compile.
    fn register(
        &mut self,
        device: &dyn GraphicsDevice,
        name: &str,
        source: ProgramSource<'_>,
    ) -> Result<ProgramId, ShaderError>;

    /// Returns the current module of a program.
    fn program(&self, id: ProgramId) -> Option<ShaderModuleId>;

    /// Returns `true` if the most recent [`poll_reloads`](Self::poll_reloads)
    /// replaced this program's module.
    fn was_rebuilt(&self, id: ProgramId) -> bool;

    /// Recompiles every program whose source changed since the last poll.
    ///
    /// A program whose recompilation fails keeps its previous module and is
    /// not reported.
    fn poll_reloads(&mut self, device: &dyn GraphicsDevice) -> Vec<ProgramReload>;
}
