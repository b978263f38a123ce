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

//! Errors raised while assembling or running the frame pipeline.

use crate::attachment::Attachment;
use crate::sequencer::FramePass;
use penumbra_core::renderer::{RenderError, ShaderError};
use thiserror::Error;

/// A frame pipeline that cannot be built.
#[derive(Debug, Error)]
pub enum PipelineSetupError {
    /// A lane reads an attachment that no strictly earlier lane writes.
    #[error("lane '{lane}' reads {attachment:?}, which no earlier lane writes")]
    UnwrittenAttachment {
        /// The offending lane.
        lane: &'static str,
        /// The attachment it reads.
        attachment: Attachment,
    },
    /// The lanes are not in frame pass order.
    #[error("lane '{lane}' runs {found:?} where {expected:?} is expected")]
    LaneOutOfOrder {
        /// The offending lane.
        lane: &'static str,
        /// The pass the sequence expects at this position.
        expected: Option<FramePass>,
        /// The pass the lane runs.
        found: FramePass,
    },
    /// The lanes do not cover every frame pass.
    #[error("the pipeline stops before {missing:?}")]
    MissingPass {
        /// The first pass without a lane.
        missing: FramePass,
    },
    /// A built-in program failed to compile.
    #[error(transparent)]
    Shader(#[from] ShaderError),
    /// A device resource could not be created.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A pass was entered out of order within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// The pass is not the next one.
    #[error("{found:?} entered while {expected:?} was expected")]
    OutOfOrder {
        /// The next pass, or `None` once the frame is complete.
        expected: Option<FramePass>,
        /// The pass that was entered.
        found: FramePass,
    },
    /// The frame ended before every pass ran.
    #[error("frame ended before {missing:?}")]
    Incomplete {
        /// The first pass that did not run.
        missing: FramePass,
    },
}

impl From<SequenceError> for RenderError {
    fn from(err: SequenceError) -> Self {
        RenderError::RenderingFailed(err.to_string())
    }
}
