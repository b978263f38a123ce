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

//! The rendering subsystem contracts.
//!
//! - [`api`] holds plain data: resource ids, descriptors and device capabilities.
//! - [`traits`] holds the backend seams: [`GraphicsDevice`], [`CommandEncoder`],
//!   [`RenderPass`] and [`ShaderProgramStore`].
//! - [`constant`] packs per-frame and per-entity constant data into one buffer.
//! - [`pipeline_cache`] memoizes vertex bindings between submeshes and shaders.
//! - [`light`] and [`light_volume`] describe lights and their screen footprint.

pub mod api;
pub mod constant;
pub mod error;
pub mod light;
pub mod light_volume;
pub mod pipeline_cache;
pub mod traits;

pub use self::api::*;
pub use self::error::{
    ConstantBufferError, PipelineError, RenderError, ResourceError, ShaderError,
};
pub use self::traits::{
    CommandEncoder, GraphicsDevice, ProgramId, ProgramReload, ProgramSource, RenderPass,
    ShaderProgramStore,
};
