/// GlDriver - OpenGL implementation of the GraphicsDriver trait
///
/// Wraps a `glow::Context` whose GL context is current on the calling thread.
/// When created through `GlContext` the driver also owns the window, surface
/// and context, so every handle holding the driver keeps them alive.

use glow::HasContext;
use glsl_compute::glc::driver::{
    BufferId, BufferUsage, DriverInfo, GraphicsDriver, MemoryBarrier, ProgramId, ShaderId,
    ShaderStage,
};
use glsl_compute::glc::{Error, ObjectKind, Result};
use glsl_compute::{glc_bail, glc_err, glc_error};

use crate::gl_context::WindowContext;

pub struct GlDriver {
    /// Dropped first: no GL call may outlive the context below
    gl: glow::Context,
    info: DriverInfo,
    _window_context: Option<WindowContext>,
}

impl GlDriver {
    /// Driver over an externally created context
    ///
    /// # Safety
    ///
    /// The context behind `gl` must be current on this thread and stay
    /// alive for as long as the driver is used.
    pub unsafe fn from_glow(gl: glow::Context) -> Self {
        let info = query_info(&gl);
        Self { gl, info, _window_context: None }
    }

    pub(crate) fn with_window_context(gl: glow::Context, window_context: WindowContext) -> Self {
        let info = query_info(&gl);
        Self { gl, info, _window_context: Some(window_context) }
    }

    /// Underlying glow context
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Drain GL_GET_ERROR into a backend error named after `operation`
    fn check_error(&self, operation: &str) -> Result<()> {
        let code = unsafe { self.gl.get_error() };
        if code == glow::NO_ERROR {
            return Ok(());
        }
        if code == glow::OUT_OF_MEMORY {
            glc_error!("glc::gl", "{}: GL_OUT_OF_MEMORY", operation);
            return Err(Error::ResourceAllocation(ObjectKind::Buffer));
        }
        glc_bail!("glc::gl", "{}: {}", operation, error_name(code));
    }
}

fn error_name(code: u32) -> String {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM".to_string(),
        glow::INVALID_VALUE => "GL_INVALID_VALUE".to_string(),
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION".to_string(),
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION".to_string(),
        other => format!("GL error {:#06x}", other),
    }
}

fn stage_to_gl(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
    }
}

fn usage_to_gl(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Stream => glow::STREAM_READ,
    }
}

fn shader(id: ShaderId) -> glow::NativeShader {
    glow::NativeShader(id.0)
}

fn program(id: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(id.0)
}

fn buffer(id: BufferId) -> glow::NativeBuffer {
    glow::NativeBuffer(id.0)
}

/// Parse the leading `major.minor` of a GL_VERSION string
pub(crate) fn parse_version(version: &str) -> (u32, u32) {
    let numeric = version
        .split_whitespace()
        .find(|token| token.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or("");
    let mut parts = numeric.split('.').map(|p| {
        p.chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse::<u32>()
            .unwrap_or(0)
    });
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

fn query_info(gl: &glow::Context) -> DriverInfo {
    unsafe {
        let version = gl.get_parameter_string(glow::VERSION);
        let glsl_version = gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION);
        let version_number = {
            let v = gl.version();
            (v.major, v.minor)
        };
        let version_number = if version_number == (0, 0) {
            parse_version(&version)
        } else {
            version_number
        };
        let supports_compute = version_number >= (4, 3)
            || gl.supported_extensions().contains("GL_ARB_compute_shader");
        let max_work_group_count = if supports_compute {
            [
                gl.get_parameter_indexed_i32(glow::MAX_COMPUTE_WORK_GROUP_COUNT, 0).max(0) as u32,
                gl.get_parameter_indexed_i32(glow::MAX_COMPUTE_WORK_GROUP_COUNT, 1).max(0) as u32,
                gl.get_parameter_indexed_i32(glow::MAX_COMPUTE_WORK_GROUP_COUNT, 2).max(0) as u32,
            ]
        } else {
            [0; 3]
        };

        DriverInfo {
            vendor: gl.get_parameter_string(glow::VENDOR),
            renderer: gl.get_parameter_string(glow::RENDERER),
            version,
            supports_glsl: version_number >= (2, 0) && !glsl_version.is_empty(),
            glsl_version,
            version_number,
            supports_compute,
            max_work_group_count,
        }
    }
}

impl GraphicsDriver for GlDriver {
    fn info(&self) -> DriverInfo {
        self.info.clone()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId> {
        unsafe { self.gl.create_shader(stage_to_gl(stage)) }
            .map(|native| ShaderId(native.0))
            .map_err(|e| {
                glc_error!("glc::gl", "glCreateShader({}) failed: {}", stage, e);
                Error::ResourceAllocation(ObjectKind::Shader)
            })
    }

    fn shader_source(&self, id: ShaderId, source: &str) {
        unsafe { self.gl.shader_source(shader(id), source) }
    }

    fn compile_shader(&self, id: ShaderId) {
        unsafe { self.gl.compile_shader(shader(id)) }
    }

    fn shader_compile_status(&self, id: ShaderId) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader(id)) }
    }

    fn shader_info_log(&self, id: ShaderId) -> String {
        unsafe { self.gl.get_shader_info_log(shader(id)) }
    }

    fn delete_shader(&self, id: ShaderId) {
        unsafe { self.gl.delete_shader(shader(id)) }
    }

    fn create_program(&self) -> Result<ProgramId> {
        unsafe { self.gl.create_program() }
            .map(|native| ProgramId(native.0))
            .map_err(|e| {
                glc_error!("glc::gl", "glCreateProgram failed: {}", e);
                Error::ResourceAllocation(ObjectKind::Program)
            })
    }

    fn attach_shader(&self, id: ProgramId, shader_id: ShaderId) {
        unsafe { self.gl.attach_shader(program(id), shader(shader_id)) }
    }

    fn detach_shader(&self, id: ProgramId, shader_id: ShaderId) {
        unsafe { self.gl.detach_shader(program(id), shader(shader_id)) }
    }

    fn link_program(&self, id: ProgramId) {
        unsafe { self.gl.link_program(program(id)) }
    }

    fn program_link_status(&self, id: ProgramId) -> bool {
        unsafe { self.gl.get_program_link_status(program(id)) }
    }

    fn program_info_log(&self, id: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(program(id)) }
    }

    fn use_program(&self, id: Option<ProgramId>) -> Result<()> {
        unsafe { self.gl.use_program(id.map(program)) }
        self.check_error("glUseProgram")
    }

    fn delete_program(&self, id: ProgramId) {
        unsafe { self.gl.delete_program(program(id)) }
    }

    fn create_buffer(&self) -> Result<BufferId> {
        unsafe { self.gl.create_buffer() }
            .map(|native| BufferId(native.0))
            .map_err(|e| {
                glc_error!("glc::gl", "glGenBuffers failed: {}", e);
                Error::ResourceAllocation(ObjectKind::Buffer)
            })
    }

    fn allocate_buffer(&self, id: BufferId, size: u64, usage: BufferUsage) -> Result<()> {
        let size = i32::try_from(size).map_err(|_| {
            glc_error!("glc::gl", "Buffer size {} exceeds the GL size range", size);
            Error::Unsupported(format!("buffers larger than {} bytes", i32::MAX))
        })?;
        unsafe {
            self.gl.bind_buffer(glow::SHADER_STORAGE_BUFFER, Some(buffer(id)));
            self.gl.buffer_data_size(glow::SHADER_STORAGE_BUFFER, size, usage_to_gl(usage));
            self.gl.bind_buffer(glow::SHADER_STORAGE_BUFFER, None);
        }
        self.check_error("glBufferData")
    }

    fn upload_buffer(&self, id: BufferId, data: &[u8], usage: BufferUsage) -> Result<()> {
        unsafe {
            self.gl.bind_buffer(glow::SHADER_STORAGE_BUFFER, Some(buffer(id)));
            self.gl.buffer_data_u8_slice(glow::SHADER_STORAGE_BUFFER, data, usage_to_gl(usage));
            self.gl.bind_buffer(glow::SHADER_STORAGE_BUFFER, None);
        }
        self.check_error("glBufferData")
    }

    fn bind_buffer_base(&self, slot: u32, id: Option<BufferId>) -> Result<()> {
        unsafe {
            self.gl.bind_buffer_base(glow::SHADER_STORAGE_BUFFER, slot, id.map(buffer));
        }
        self.check_error("glBindBufferBase")
    }

    fn read_buffer(&self, id: BufferId, offset: u64, dst: &mut [u8]) -> Result<()> {
        let offset = i32::try_from(offset)
            .map_err(|_| glc_err!("glc::gl", "Read offset {} exceeds the GL size range", offset))?;
        unsafe {
            self.gl.bind_buffer(glow::SHADER_STORAGE_BUFFER, Some(buffer(id)));
            self.gl.get_buffer_sub_data(glow::SHADER_STORAGE_BUFFER, offset, dst);
            self.gl.bind_buffer(glow::SHADER_STORAGE_BUFFER, None);
        }
        self.check_error("glGetBufferSubData")
    }

    fn delete_buffer(&self, id: BufferId) {
        unsafe { self.gl.delete_buffer(buffer(id)) }
    }

    fn dispatch_compute(&self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()> {
        unsafe { self.gl.dispatch_compute(groups_x, groups_y, groups_z) }
        self.check_error("glDispatchCompute")
    }

    fn memory_barrier(&self, barrier: MemoryBarrier) -> Result<()> {
        unsafe { self.gl.memory_barrier(barrier.bits()) }
        self.check_error("glMemoryBarrier")
    }
}

#[cfg(test)]
#[path = "gl_driver_tests.rs"]
mod tests;
