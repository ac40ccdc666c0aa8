/*!
# GLSL Compute

Core types for running a GLSL compute shader through a graphics driver.

The crate never creates a context itself: a backend (see
`glsl_compute_backend_gl`) hands it a ready [`GraphicsDriver`](driver::GraphicsDriver)
and every GPU object is owned by a handle that releases it on drop.

## Architecture

- **GraphicsDriver**: Driver entry points (shader, program, buffer, dispatch)
- **ShaderObject**: Compiled shader stage, created by `compile_shader`
- **Program**: Linked program owning its storage `BindingTable`
- **StorageBuffer**: Fixed-size shader storage buffer with exact-length transfers
- **vector_add**: End-to-end element-wise add of two vec4 arrays
*/

// Internal modules
mod error;
mod runtime;
pub mod log;
pub mod driver;
pub mod shader;
pub mod program;
pub mod buffer;
pub mod dispatch;
pub mod capability;
pub mod vector_add;

#[cfg(test)]
pub(crate) mod test_utils;

// Main glc namespace module
pub mod glc {
    // Error types
    pub use crate::error::{Error, ObjectKind, Result};

    // Logging facade
    pub use crate::runtime::Runtime;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Driver seam
    pub mod driver {
        pub use crate::driver::*;
    }

    // Compute harness
    pub use crate::shader::{compile_shader, compile_source, ShaderObject, ShaderSource};
    pub use crate::program::{BindingTable, Program};
    pub use crate::buffer::StorageBuffer;
    pub use crate::dispatch::DispatchGrid;
    pub use crate::capability::check_gpu_status;
    pub use crate::vector_add::{VectorAddConfig, VectorAddReport};
}

// Re-export math library at crate root
pub use glam;
pub use bytemuck;
