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

//! Render pass lanes of the Penumbra deferred renderer and the frame pipeline
//! that sequences them.
//!
//! Each lane records one pass of the frame (depth pre-pass, G-buffer fill,
//! ambient occlusion, its blur, lighting, composite) against the abstract
//! device of `penumbra-core`. [`FramePipeline`] owns the shared state: render
//! targets, the constant allocator, the binding cache and the internal
//! primitives.

#![warn(missing_docs)]

pub mod attachment;
pub mod context;
pub mod error;
pub mod kernel;
pub mod lane;
pub mod lanes;
pub mod pipeline;
pub mod primitives;
pub mod sequencer;
pub mod shaders;
pub mod targets;

pub use attachment::Attachment;
pub use context::RenderContext;
pub use error::{PipelineSetupError, SequenceError};
pub use lane::{FrameContext, LaneStats, PassLane};
pub use pipeline::{validate_lane_order, FramePipeline, FrameReport};
pub use sequencer::{FramePass, PassSequencer};
pub use shaders::BuiltinProgram;
