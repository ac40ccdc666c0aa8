//! Error types for the GLSL compute harness
//!
//! This module defines the single error type returned by every fallible
//! operation: driver object allocation, shader source access, compilation,
//! linking, buffer transfers and dispatch validation.

use std::fmt;
use std::path::PathBuf;

use crate::driver::ShaderStage;

/// Result type for GLSL compute operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of driver object that could not be created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Shader object (one compiled stage)
    Shader,
    /// Program object (linked stages)
    Program,
    /// Storage buffer object
    Buffer,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Shader => write!(f, "shader object"),
            ObjectKind::Program => write!(f, "shader program object"),
            ObjectKind::Buffer => write!(f, "storage buffer object"),
        }
    }
}

/// GLSL compute errors
#[derive(Debug, Clone)]
pub enum Error {
    /// The driver refused to create an object (resource exhaustion)
    ResourceAllocation(ObjectKind),

    /// Shader source file could not be read
    SourceRead {
        /// Path of the shader source
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// Driver rejected a shader source
    CompilationFailed {
        /// Path (or label) of the shader source
        path: PathBuf,
        /// Stage the source was compiled for
        stage: ShaderStage,
        /// Driver diagnostic log (may be empty)
        log: String,
    },

    /// Driver failed to link attached stages into a program
    LinkFailed {
        /// Sources of the attached stages
        sources: Vec<PathBuf>,
        /// Driver program log (may be empty)
        log: String,
    },

    /// Transfer attempted before `allocate`
    BufferNotAllocated,

    /// Host region does not match the allocated buffer size
    BufferSizeMismatch {
        /// Allocated size in bytes
        expected: u64,
        /// Size of the host region in bytes
        actual: u64,
    },

    /// Dispatch grid rejected (zero, non-divisible or over the driver limit)
    InvalidDispatch(String),

    /// Context or capability initialization failed
    InitializationFailed(String),

    /// Required driver feature missing
    Unsupported(String),

    /// Backend-specific error (OpenGL, windowing, etc.)
    BackendError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceAllocation(kind) => write!(f, "Error creating {}", kind),
            Error::SourceRead { path, reason } => {
                write!(f, "Cannot read the file {}: {}", path.display(), reason)
            }
            Error::CompilationFailed { path, stage, log } => {
                write!(f, "Shader compilation failed: {} ({:?})", path.display(), stage)?;
                if !log.is_empty() {
                    write!(f, "\nShader log:\n{}", log)?;
                }
                Ok(())
            }
            Error::LinkFailed { sources, log } => {
                let names: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
                write!(f, "Shader program link failed ({})", names.join(", "))?;
                if !log.is_empty() {
                    write!(f, "\nProgram log:\n{}", log)?;
                }
                Ok(())
            }
            Error::BufferNotAllocated => write!(f, "Storage buffer used before allocate()"),
            Error::BufferSizeMismatch { expected, actual } => write!(
                f,
                "Buffer size mismatch: buffer holds {} bytes, host region has {} bytes",
                expected, actual
            ),
            Error::InvalidDispatch(msg) => write!(f, "Invalid dispatch: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
