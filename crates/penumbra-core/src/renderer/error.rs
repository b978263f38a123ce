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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::pipeline::{RenderPipelineId, ShaderModuleId};
use crate::renderer::constant::ConstantRegion;
use crate::renderer::traits::ProgramId;
use std::fmt;

/// An error related to loading or compiling a shader program.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source could not be read from a path.
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O error.
        source_error: String,
    },
    /// The shader source failed to compile.
    CompilationError {
        /// The program name.
        label: String,
        /// Compiler output.
        details: String,
    },
    /// The requested shader module does not exist.
    NotFound {
        /// The ID of the missing shader module.
        id: ShaderModuleId,
    },
    /// The program store has no program with this id.
    UnknownProgram {
        /// The unknown program id.
        id: ProgramId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LoadError { path, source_error } => {
                write!(
                    f,
                    "Failed to load shader source from '{path}': {source_error}"
                )
            }
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
            ShaderError::NotFound { id } => {
                write!(f, "Shader module not found for ID: {id:?}")
            }
            ShaderError::UnknownProgram { id } => {
                write!(f, "No shader program registered for {id:?}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of pipeline state or vertex bindings.
#[derive(Debug)]
pub enum PipelineError {
    /// A shader input has no attribute at the same location in the submesh layout.
    LayoutMismatch {
        /// The shader whose input could not be satisfied.
        shader: ShaderModuleId,
        /// The unsatisfied input location.
        location: u32,
        /// Label of the submesh being bound.
        submesh: String,
    },
    /// The submesh index is out of range for the mesh.
    InvalidSubmesh {
        /// Label of the mesh.
        mesh: String,
        /// The requested index.
        index: usize,
    },
    /// The backend rejected the pipeline state.
    CompilationFailed {
        /// Debug label of the pipeline, if available.
        label: Option<String>,
        /// Backend details.
        details: String,
    },
    /// The render pipeline ID is not valid.
    InvalidRenderPipeline {
        /// The invalid ID.
        id: RenderPipelineId,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayoutMismatch {
                shader,
                location,
                submesh,
            } => write!(
                f,
                "Shader {shader:?} reads input location {location} which submesh '{submesh}' does not provide"
            ),
            PipelineError::InvalidSubmesh { mesh, index } => {
                write!(f, "Mesh '{mesh}' has no submesh at index {index}")
            }
            PipelineError::CompilationFailed { label, details } => write!(
                f,
                "Pipeline compilation failed for '{}': {}",
                label.as_deref().unwrap_or("Unknown"),
                details
            ),
            PipelineError::InvalidRenderPipeline { id } => {
                write!(f, "Invalid render pipeline ID: {id:?}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// A resource could not be found.
    NotFound,
    /// The handle used to reference a resource is invalid.
    InvalidHandle,
    /// An error reported by the graphics backend.
    BackendError(String),
    /// A buffer or texture access exceeded the resource bounds.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// Misuse or exhaustion of the constant-region allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantBufferError {
    /// `begin_frame` was called while a session was already open.
    SessionAlreadyOpen,
    /// A write or `end_frame` happened outside of an open session.
    SessionNotOpen,
    /// The allocation would move the head past the buffer capacity.
    Overflow {
        /// Requested bytes.
        requested: u64,
        /// The aligned head at the time of the request.
        head: u64,
        /// Buffer capacity.
        capacity: u64,
    },
    /// The requested alignment is not a power of two.
    InvalidAlignment(u64),
    /// The scene holds more lights than the global block can carry.
    TooManyLights {
        /// Lights in the scene.
        count: usize,
        /// Capacity of the light array.
        max: usize,
    },
    /// The write does not fit inside its region.
    WriteOutOfRegion {
        /// The region written to.
        region: ConstantRegion,
        /// Offset of the write inside the region.
        offset: u64,
        /// Length of the write.
        len: u64,
    },
}

impl fmt::Display for ConstantBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantBufferError::SessionAlreadyOpen => {
                write!(f, "A constant buffer session is already open")
            }
            ConstantBufferError::SessionNotOpen => {
                write!(f, "No constant buffer session is open")
            }
            ConstantBufferError::Overflow {
                requested,
                head,
                capacity,
            } => write!(
                f,
                "Constant buffer overflow: {requested} bytes requested at head {head}, capacity {capacity}"
            ),
            ConstantBufferError::InvalidAlignment(a) => {
                write!(f, "Alignment {a} is not a power of two")
            }
            ConstantBufferError::TooManyLights { count, max } => {
                write!(f, "{count} lights exceed the light array capacity of {max}")
            }
            ConstantBufferError::WriteOutOfRegion {
                region,
                offset,
                len,
            } => write!(
                f,
                "Write of {len} bytes at offset {offset} exceeds region of {} bytes at {}",
                region.size, region.offset
            ),
        }
    }
}

impl std::error::Error for ConstantBufferError {}

/// A high-level error that aborts renderer initialization or a frame.
#[derive(Debug)]
pub enum RenderError {
    /// A set of render targets does not form a complete framebuffer.
    FramebufferIncomplete {
        /// The framebuffer label.
        label: String,
        /// The reason reported by the device.
        reason: String,
    },
    /// The constant buffer was exhausted or misused.
    ConstantBuffer(ConstantBufferError),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// A rendering operation failed.
    RenderingFailed(String),
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::FramebufferIncomplete { label, reason } => {
                write!(f, "Framebuffer '{label}' is incomplete: {reason}")
            }
            RenderError::ConstantBuffer(err) => write!(f, "Constant buffer error: {err}"),
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::RenderingFailed(msg) => {
                write!(f, "A critical rendering operation failed: {msg}")
            }
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            RenderError::ConstantBuffer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ConstantBufferError> for RenderError {
    fn from(err: ConstantBufferError) -> Self {
        RenderError::ConstantBuffer(err)
    }
}

impl From<PipelineError> for RenderError {
    fn from(err: PipelineError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationError {
            label: "geometry".to_string(),
            details: "syntax error at line 5".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader compilation failed for 'geometry': syntax error at line 5"
        );
    }

    #[test]
    fn layout_mismatch_wraps_into_render_error() {
        let err: RenderError = PipelineError::LayoutMismatch {
            shader: ShaderModuleId(7),
            location: 3,
            submesh: "cube/0".to_string(),
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "Graphics resource operation failed: Pipeline resource error: Shader ShaderModuleId(7) reads input location 3 which submesh 'cube/0' does not provide"
        );
        assert!(err.source().is_some());
        assert!(err.source().unwrap().source().is_some());
    }

    #[test]
    fn overflow_display() {
        let err = ConstantBufferError::Overflow {
            requested: 128,
            head: 1024,
            capacity: 1088,
        };
        assert_eq!(
            format!("{err}"),
            "Constant buffer overflow: 128 bytes requested at head 1024, capacity 1088"
        );
    }

    #[test]
    fn every_render_error_is_reachable_and_displayed() {
        let errors = [
            RenderError::FramebufferIncomplete {
                label: "G-Buffer".to_string(),
                reason: "no attachments".to_string(),
            },
            ConstantBufferError::TooManyLights { count: 257, max: 256 }.into(),
            ResourceError::NotFound.into(),
            RenderError::RenderingFailed("lost".to_string()),
            RenderError::Internal("state".to_string()),
        ];
        for err in &errors {
            // Exhaustive so that a new variant must be added above.
            let (prefix, has_source) = match err {
                RenderError::FramebufferIncomplete { .. } => ("Framebuffer 'G-Buffer'", false),
                RenderError::ConstantBuffer(_) => ("Constant buffer error: 257 lights", true),
                RenderError::ResourceError(_) => ("Graphics resource", true),
                RenderError::RenderingFailed(_) => ("A critical rendering", false),
                RenderError::Internal(_) => ("An internal", false),
            };
            assert!(err.to_string().starts_with(prefix), "{err}");
            assert_eq!(err.source().is_some(), has_source);
        }
    }
}
