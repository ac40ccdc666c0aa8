/// Mock graphics driver for unit tests (no GPU required)
///
/// Keeps every driver object in host memory, runs a pluggable CPU kernel on
/// dispatch and records a journal of driver calls. Shader sources go through a
/// tiny GLSL front check so that malformed sources fail compilation with a
/// non-empty log, the way a real driver would.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Mutex;
use rustc_hash::FxHashMap;

use crate::driver::{
    BufferId, BufferUsage, DriverInfo, GraphicsDriver, MemoryBarrier, ProgramId, ShaderId,
    ShaderStage,
};
use crate::error::{Error, ObjectKind, Result};

// ============================================================================
// Kernel invocation
// ============================================================================

/// CPU stand-in for a compute kernel
pub type MockKernel = Box<dyn Fn(&mut MockDispatch) + Send + Sync>;

/// State handed to a [`MockKernel`] on dispatch
#[derive(Debug)]
pub struct MockDispatch {
    /// Work-group counts passed to dispatch_compute
    pub groups: [u32; 3],
    /// Contents of every bound storage slot
    pub buffers: BTreeMap<u32, Vec<u8>>,
}

impl MockDispatch {
    /// Contents of a slot as f32 values (empty when unbound)
    pub fn f32s(&self, slot: u32) -> Vec<f32> {
        self.buffers
            .get(&slot)
            .map(|bytes| {
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Overwrite a bound slot with f32 values
    pub fn write_f32s(&mut self, slot: u32, values: &[f32]) {
        if let Some(bytes) = self.buffers.get_mut(&slot) {
            let src: &[u8] = bytemuck::cast_slice(values);
            let n = src.len().min(bytes.len());
            bytes[..n].copy_from_slice(&src[..n]);
        }
    }
}

// ============================================================================
// Mock objects
// ============================================================================

#[derive(Debug)]
struct MockShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct MockProgramObject {
    attached: Vec<u32>,
    linked: bool,
    log: String,
}

#[derive(Debug, Default)]
struct MockBufferObject {
    data: Vec<u8>,
    usage: Option<BufferUsage>,
}

#[derive(Default)]
struct MockState {
    next_id: u32,
    shaders: FxHashMap<u32, MockShaderObject>,
    programs: FxHashMap<u32, MockProgramObject>,
    buffers: FxHashMap<u32, MockBufferObject>,
    bindings: BTreeMap<u32, u32>,
    current_program: Option<u32>,
    pending_writes: Vec<(u32, Vec<u8>)>,
    journal: Vec<String>,
    refuse_shaders: bool,
    refuse_programs: bool,
    refuse_buffers: bool,
    refuse_dispatches: bool,
}

impl MockState {
    fn next_name(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        // next_id starts at 0 and is incremented first
        NonZeroU32::new(self.next_id).unwrap_or(NonZeroU32::MIN)
    }
}

// ============================================================================
// Mock driver
// ============================================================================

/// In-memory graphics driver
pub struct MockDriver {
    state: Mutex<MockState>,
    kernel: Option<MockKernel>,
    info: DriverInfo,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            kernel: None,
            info: DriverInfo {
                vendor: "Mock Vendor".to_string(),
                renderer: "Mock Renderer".to_string(),
                version: "4.6.0 Mock".to_string(),
                glsl_version: "4.60 Mock".to_string(),
                version_number: (4, 6),
                supports_glsl: true,
                supports_compute: true,
                max_work_group_count: [65535, 65535, 65535],
            },
        }
    }

    /// Run `kernel` on every valid dispatch
    pub fn with_kernel<F>(mut self, kernel: F) -> Self
    where
        F: Fn(&mut MockDispatch) + Send + Sync + 'static,
    {
        self.kernel = Some(Box::new(kernel));
        self
    }

    /// Report a different capability set
    pub fn with_info(mut self, info: DriverInfo) -> Self {
        self.info = info;
        self
    }

    pub fn refuse_shaders(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_shaders = refuse;
    }

    pub fn refuse_programs(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_programs = refuse;
    }

    pub fn refuse_buffers(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_buffers = refuse;
    }

    /// Fail every dispatch_compute the way a driver raising an error would
    pub fn refuse_dispatches(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_dispatches = refuse;
    }

    /// Driver calls in issue order
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Position of the first journal entry starting with `prefix`
    pub fn journal_position(&self, prefix: &str) -> Option<usize> {
        self.journal().iter().position(|call| call.starts_with(prefix))
    }

    pub fn live_shaders(&self) -> usize {
        self.state.lock().unwrap().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.lock().unwrap().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().unwrap().buffers.len()
    }

    /// Committed contents of a buffer
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state.lock().unwrap().buffers.get(&buffer.0.get()).map(|b| b.data.clone())
    }

    /// Usage hint of the last data store specification
    pub fn buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.state.lock().unwrap().buffers.get(&buffer.0.get()).and_then(|b| b.usage)
    }

    /// Buffer currently bound to an indexed storage slot
    pub fn binding(&self, slot: u32) -> Option<BufferId> {
        self.state
            .lock()
            .unwrap()
            .bindings
            .get(&slot)
            .and_then(|id| NonZeroU32::new(*id))
            .map(BufferId)
    }

    /// Shaders attached to a program
    pub fn attached_count(&self, program: ProgramId) -> usize {
        self.state
            .lock()
            .unwrap()
            .programs
            .get(&program.0.get())
            .map(|p| p.attached.len())
            .unwrap_or(0)
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state
            .lock()
            .unwrap()
            .current_program
            .and_then(NonZeroU32::new)
            .map(ProgramId)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// GLSL front check
// ============================================================================

/// Diagnostics for a source, empty when it "compiles"
///
/// Checks only what a test can break on purpose: a leading `#version`
/// directive and balanced braces/parentheses.
fn check_source(source: &str) -> Vec<String> {
    let mut errors = Vec::new();

    let first = source.lines().map(str::trim).find(|l| !l.is_empty() && !l.starts_with("//"));
    match first {
        None => {
            errors.push("0:1(1): error: syntax error, unexpected end of file".to_string());
            return errors;
        }
        Some(line) if !line.starts_with("#version") => {
            errors.push("0:1(1): error: missing #version directive".to_string());
        }
        Some(_) => {}
    }

    let mut stack: Vec<(char, usize)> = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let code = line.split("//").next().unwrap_or("");
        for c in code.chars() {
            match c {
                '{' | '(' => stack.push((c, line_no)),
                '}' | ')' => {
                    let expected = if c == '}' { '{' } else { '(' };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => errors.push(format!("0:{}(1): error: syntax error, unexpected '{}'", line_no, c)),
                    }
                }
                _ => {}
            }
        }
    }
    if let Some((open, line_no)) = stack.last() {
        let close = if *open == '{' { '}' } else { ')' };
        errors.push(format!(
            "0:{}(1): error: syntax error, unexpected end of file, expecting '{}'",
            line_no, close
        ));
    }

    errors
}

fn has_main(source: &str) -> bool {
    source.contains("void main")
}

// ============================================================================
// GraphicsDriver implementation
// ============================================================================

impl GraphicsDriver for MockDriver {
    fn info(&self) -> DriverInfo {
        self.info.clone()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("create_shader({:?})", stage));
        if state.refuse_shaders {
            return Err(Error::ResourceAllocation(ObjectKind::Shader));
        }
        let name = state.next_name();
        state.shaders.insert(name.get(), MockShaderObject {
            stage,
            source: String::new(),
            compiled: false,
            log: String::new(),
        });
        Ok(ShaderId(name))
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("shader_source".to_string());
        if let Some(obj) = state.shaders.get_mut(&shader.0.get()) {
            obj.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("compile_shader".to_string());
        if let Some(obj) = state.shaders.get_mut(&shader.0.get()) {
            let errors = check_source(&obj.source);
            obj.compiled = errors.is_empty();
            obj.log = errors.join("\n");
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        let state = self.state.lock().unwrap();
        state.shaders.get(&shader.0.get()).map(|s| s.compiled).unwrap_or(false)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        let state = self.state.lock().unwrap();
        state.shaders.get(&shader.0.get()).map(|s| s.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("delete_shader".to_string());
        state.shaders.remove(&shader.0.get());
    }

    fn create_program(&self) -> Result<ProgramId> {
        let mut state = self.state.lock().unwrap();
        state.journal.push("create_program".to_string());
        if state.refuse_programs {
            return Err(Error::ResourceAllocation(ObjectKind::Program));
        }
        let name = state.next_name();
        state.programs.insert(name.get(), MockProgramObject::default());
        Ok(ProgramId(name))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("attach_shader".to_string());
        if let Some(obj) = state.programs.get_mut(&program.0.get()) {
            if !obj.attached.contains(&shader.0.get()) {
                obj.attached.push(shader.0.get());
            }
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("detach_shader".to_string());
        if let Some(obj) = state.programs.get_mut(&program.0.get()) {
            obj.attached.retain(|id| *id != shader.0.get());
        }
    }

    fn link_program(&self, program: ProgramId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("link_program".to_string());

        let attached = match state.programs.get(&program.0.get()) {
            Some(obj) => obj.attached.clone(),
            None => return,
        };

        let mut errors = Vec::new();
        let shaders: Vec<&MockShaderObject> =
            attached.iter().filter_map(|id| state.shaders.get(id)).collect();

        if shaders.is_empty() {
            errors.push("error: no shaders attached to the program".to_string());
        }
        if shaders.iter().any(|s| !s.compiled) {
            errors.push("error: linking with uncompiled shader".to_string());
        }
        let has_compute = shaders.iter().any(|s| s.stage == ShaderStage::Compute);
        if has_compute && shaders.iter().any(|s| s.stage != ShaderStage::Compute) {
            errors.push(
                "error: Compute shaders may not be linked with any other type of shader".to_string(),
            );
        }
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Compute] {
            let sources: Vec<&&MockShaderObject> = shaders.iter().filter(|s| s.stage == stage).collect();
            if !sources.is_empty() && !sources.iter().any(|s| has_main(&s.source)) {
                errors.push(format!("error: {} shader lacks `main'", stage));
            }
        }
        if has_compute
            && !shaders
                .iter()
                .any(|s| s.stage == ShaderStage::Compute && s.source.contains("local_size_x"))
        {
            errors.push("error: compute shader must contain a fixed local group size".to_string());
        }

        if let Some(obj) = state.programs.get_mut(&program.0.get()) {
            obj.linked = errors.is_empty();
            obj.log = errors.join("\n");
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        let state = self.state.lock().unwrap();
        state.programs.get(&program.0.get()).map(|p| p.linked).unwrap_or(false)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        let state = self.state.lock().unwrap();
        state.programs.get(&program.0.get()).map(|p| p.log.clone()).unwrap_or_default()
    }

    fn use_program(&self, program: Option<ProgramId>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push("use_program".to_string());
        if let Some(id) = program {
            if !state.programs.contains_key(&id.0.get()) {
                return Err(Error::BackendError("glUseProgram: GL_INVALID_VALUE".to_string()));
            }
        }
        state.current_program = program.map(|p| p.0.get());
        Ok(())
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("delete_program".to_string());
        state.programs.remove(&program.0.get());
        if state.current_program == Some(program.0.get()) {
            state.current_program = None;
        }
    }

    fn create_buffer(&self) -> Result<BufferId> {
        let mut state = self.state.lock().unwrap();
        state.journal.push("create_buffer".to_string());
        if state.refuse_buffers {
            return Err(Error::ResourceAllocation(ObjectKind::Buffer));
        }
        let name = state.next_name();
        state.buffers.insert(name.get(), MockBufferObject::default());
        Ok(BufferId(name))
    }

    fn allocate_buffer(&self, buffer: BufferId, size: u64, usage: BufferUsage) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("allocate_buffer({})", size));
        let obj = state
            .buffers
            .get_mut(&buffer.0.get())
            .ok_or_else(|| Error::BackendError("GL_INVALID_OPERATION: unknown buffer".to_string()))?;
        obj.data = vec![0; size as usize];
        obj.usage = Some(usage);
        Ok(())
    }

    fn upload_buffer(&self, buffer: BufferId, data: &[u8], usage: BufferUsage) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("upload_buffer({})", data.len()));
        let obj = state
            .buffers
            .get_mut(&buffer.0.get())
            .ok_or_else(|| Error::BackendError("GL_INVALID_OPERATION: unknown buffer".to_string()))?;
        obj.data = data.to_vec();
        obj.usage = Some(usage);
        Ok(())
    }

    fn bind_buffer_base(&self, slot: u32, buffer: Option<BufferId>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("bind_buffer_base({})", slot));
        match buffer {
            Some(id) => {
                if !state.buffers.contains_key(&id.0.get()) {
                    return Err(Error::BackendError("glBindBufferBase: GL_INVALID_VALUE".to_string()));
                }
                state.bindings.insert(slot, id.0.get());
            }
            None => {
                state.bindings.remove(&slot);
            }
        }
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferId, offset: u64, dst: &mut [u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("read_buffer({})", dst.len()));
        let obj = state
            .buffers
            .get(&buffer.0.get())
            .ok_or_else(|| Error::BackendError("GL_INVALID_OPERATION: unknown buffer".to_string()))?;
        let start = offset as usize;
        let end = start + dst.len();
        if end > obj.data.len() {
            return Err(Error::BackendError("GL_INVALID_VALUE: read past end of buffer".to_string()));
        }
        dst.copy_from_slice(&obj.data[start..end]);
        Ok(())
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.lock().unwrap();
        state.journal.push("delete_buffer".to_string());
        let name = buffer.0.get();
        state.buffers.remove(&name);
        state.bindings.retain(|_, bound| *bound != name);
        state.pending_writes.retain(|(id, _)| *id != name);
    }

    fn dispatch_compute(&self, groups_x: u32, groups_y: u32, groups_z: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("dispatch_compute({}, {}, {})", groups_x, groups_y, groups_z));

        let linked = state
            .current_program
            .and_then(|id| state.programs.get(&id))
            .map(|p| p.linked)
            .unwrap_or(false);
        if !linked || state.refuse_dispatches {
            return Err(Error::BackendError("glDispatchCompute: GL_INVALID_OPERATION".to_string()));
        }
        let limits = self.info.max_work_group_count;
        if groups_x > limits[0] || groups_y > limits[1] || groups_z > limits[2] {
            return Err(Error::BackendError("glDispatchCompute: GL_INVALID_VALUE".to_string()));
        }

        let Some(kernel) = &self.kernel else {
            return Ok(());
        };

        let mut dispatch = MockDispatch {
            groups: [groups_x, groups_y, groups_z],
            buffers: state
                .bindings
                .iter()
                .filter_map(|(slot, id)| state.buffers.get(id).map(|b| (*slot, b.data.clone())))
                .collect(),
        };
        kernel(&mut dispatch);

        let bindings: Vec<(u32, u32)> = state.bindings.iter().map(|(s, b)| (*s, *b)).collect();
        for (slot, id) in bindings {
            if let Some(data) = dispatch.buffers.remove(&slot) {
                let changed = state.buffers.get(&id).map(|b| b.data != data).unwrap_or(false);
                if changed {
                    state.pending_writes.push((id, data));
                }
            }
        }
        Ok(())
    }

    /// Kernel writes reach read-backs only through a buffer-update barrier
    fn memory_barrier(&self, barrier: MemoryBarrier) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(format!("memory_barrier({:#x})", barrier.bits()));
        if barrier.contains(MemoryBarrier::BUFFER_UPDATE) {
            let writes = std::mem::take(&mut state.pending_writes);
            for (id, data) in writes {
                if let Some(obj) = state.buffers.get_mut(&id) {
                    obj.data = data;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_driver_tests.rs"]
mod tests;
