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

//! Foundational crate of the Penumbra deferred renderer.
//!
//! `penumbra-core` holds the contracts every other crate is written against:
//! the math primitives, the backend-agnostic renderer API (resource ids,
//! descriptors, the [`GraphicsDevice`](renderer::traits::GraphicsDevice)
//! trait), the constant-region allocator, the pipeline-state cache and the
//! scene/asset records that a frame is built from.

#![warn(missing_docs)]

pub mod math;
pub mod renderer;
pub mod scene;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;

pub use settings::{DisplayAttachment, RenderSettings, SsaoSettings};
