/// GraphicsDriver trait - driver entry points used by the harness
///
/// Each method is a thin, safe wrapper over one shading-language pipeline call
/// of the underlying driver. Object handles are opaque non-zero integers; the
/// owning wrappers in `shader`, `program` and `buffer` pair every `create_*`
/// with the matching `delete_*`.

use std::fmt;
use std::num::NonZeroU32;
use bitflags::bitflags;

use crate::error::Result;

// ============================================================================
// Handles and enums
// ============================================================================

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment/Pixel shader
    Fragment,
    /// Compute shader
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
            ShaderStage::Compute => write!(f, "compute"),
        }
    }
}

/// Driver-side shader object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub NonZeroU32);

/// Driver-side program object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub NonZeroU32);

/// Driver-side buffer object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub NonZeroU32);

/// Buffer usage hint passed with every data store (re)specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once, read many times by the GPU
    Static,
    /// Rewritten repeatedly by the host
    Dynamic,
    /// Written once by the host, read back after use
    Stream,
}

bitflags! {
    /// Memory classes a barrier makes coherent
    ///
    /// Bit values match the OpenGL `*_BARRIER_BIT` constants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryBarrier: u32 {
        /// Buffer reads/writes through buffer update commands (glGetBufferSubData, ...)
        const BUFFER_UPDATE = 0x0000_0200;
        /// Shader storage block accesses
        const SHADER_STORAGE = 0x0000_2000;
    }
}

/// Driver capability report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    /// GL_VENDOR
    pub vendor: String,
    /// GL_RENDERER
    pub renderer: String,
    /// GL_VERSION
    pub version: String,
    /// GL_SHADING_LANGUAGE_VERSION
    pub glsl_version: String,
    /// Numeric context version (major, minor)
    pub version_number: (u32, u32),
    /// The shading language is usable (vertex + fragment shader objects)
    pub supports_glsl: bool,
    /// Compute shaders are usable
    pub supports_compute: bool,
    /// GL_MAX_COMPUTE_WORK_GROUP_COUNT per dimension
    pub max_work_group_count: [u32; 3],
}

// ============================================================================
// GraphicsDriver trait
// ============================================================================

/// Driver entry points needed to compile, link, bind and dispatch
///
/// Implemented by backend drivers (e.g., the OpenGL driver in
/// `glsl_compute_backend_gl`) and by the mock driver used in tests.
/// Methods take `&self`: the driver owns whatever context state it needs.
pub trait GraphicsDriver {
    /// Capability report of the current context
    fn info(&self) -> DriverInfo;

    /// Create an empty shader object of the given stage
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId>;

    /// Replace the source text of a shader object
    fn shader_source(&self, shader: ShaderId, source: &str);

    /// Compile the current source of a shader object
    fn compile_shader(&self, shader: ShaderId);

    /// Status of the last compilation
    fn shader_compile_status(&self, shader: ShaderId) -> bool;

    /// Diagnostic log of the last compilation (may be empty)
    fn shader_info_log(&self, shader: ShaderId) -> String;

    /// Release a shader object
    fn delete_shader(&self, shader: ShaderId);

    /// Create an empty program object
    fn create_program(&self) -> Result<ProgramId>;

    /// Attach a compiled shader object
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);

    /// Detach a shader object
    fn detach_shader(&self, program: ProgramId, shader: ShaderId);

    /// Link attached shaders into an executable
    fn link_program(&self, program: ProgramId);

    /// Status of the last link
    fn program_link_status(&self, program: ProgramId) -> bool;

    /// Diagnostic log of the last link (may be empty)
    fn program_info_log(&self, program: ProgramId) -> String;

    /// Make a program current (None unbinds)
    fn use_program(&self, program: Option<ProgramId>) -> Result<()>;

    /// Release a program object
    fn delete_program(&self, program: ProgramId);

    /// Create an empty buffer object
    fn create_buffer(&self) -> Result<BufferId>;

    /// (Re)specify the data store of a buffer with `size` undefined bytes
    fn allocate_buffer(&self, buffer: BufferId, size: u64, usage: BufferUsage) -> Result<()>;

    /// (Re)specify the data store of a buffer with `data`
    fn upload_buffer(&self, buffer: BufferId, data: &[u8], usage: BufferUsage) -> Result<()>;

    /// Bind a buffer to an indexed shader storage slot (None unbinds)
    fn bind_buffer_base(&self, slot: u32, buffer: Option<BufferId>) -> Result<()>;

    /// Read `dst.len()` bytes starting at `offset`; blocks until the data is available
    fn read_buffer(&self, buffer: BufferId, offset: u64, dst: &mut [u8]) -> Result<()>;

    /// Release a buffer object
    fn delete_buffer(&self, buffer: BufferId);

    /// Launch the current program over a grid of work groups
    ///
    /// Fails when the driver rejects the launch (no current compute program,
    /// grid over the limits).
    fn dispatch_compute(&self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()>;

    /// Order prior shader writes before subsequent accesses of the given classes
    fn memory_barrier(&self, barrier: MemoryBarrier) -> Result<()>;
}
