/// Program linker and program-owned storage bindings
///
/// A `Program` owns its driver program object and a `BindingTable`. The
/// table is the only record of which buffer sits at which storage slot; it is
/// re-applied on every dispatch so that no other code can change what the
/// kernel sees between binding and dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::buffer::StorageBuffer;
use crate::dispatch::DispatchGrid;
use crate::driver::{GraphicsDriver, MemoryBarrier, ProgramId, ShaderStage};
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::shader::ShaderObject;
use crate::{glc_debug, glc_info, glc_trace, glc_warn};

// ============================================================================
// BindingTable
// ============================================================================

/// Storage slot -> buffer relation of one program
///
/// Non-owning: entries borrow the buffers, so a buffer cannot be dropped
/// while a table still binds it.
#[derive(Clone, Default)]
pub struct BindingTable<'b> {
    slots: BTreeMap<u32, &'b StorageBuffer>,
}

impl<'b> BindingTable<'b> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `buffer` at `slot`, returning the buffer it replaces
    pub fn set(&mut self, slot: u32, buffer: &'b StorageBuffer) -> Option<&'b StorageBuffer> {
        self.slots.insert(slot, buffer)
    }

    pub fn get(&self, slot: u32) -> Option<&'b StorageBuffer> {
        self.slots.get(&slot).copied()
    }

    pub fn remove(&mut self, slot: u32) -> Option<&'b StorageBuffer> {
        self.slots.remove(&slot)
    }

    /// Bindings in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &'b StorageBuffer)> + '_ {
        self.slots.iter().map(|(slot, buffer)| (*slot, *buffer))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for BindingTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter().map(|(slot, buffer)| (slot, buffer.id()))).finish()
    }
}

// ============================================================================
// Program
// ============================================================================

/// Linked shader program
///
/// `'b` is the lifetime of the storage buffers bound through
/// [`Program::bind_storage`].
pub struct Program<'b> {
    driver: Arc<dyn GraphicsDriver>,
    id: ProgramId,
    stages: Vec<ShaderStage>,
    sources: Vec<PathBuf>,
    local_size: Option<[u32; 3]>,
    bindings: BindingTable<'b>,
}

impl<'b> Program<'b> {
    /// Link a vertex and a fragment shader
    ///
    /// # Errors
    ///
    /// * `Error::LinkFailed` - wrong stages, or the driver rejected the link
    /// * `Error::ResourceAllocation` - the driver refused a program object
    pub fn setup_graphics(vertex: ShaderObject, fragment: ShaderObject) -> Result<Self> {
        if vertex.stage() != ShaderStage::Vertex || fragment.stage() != ShaderStage::Fragment {
            let error = Error::LinkFailed {
                sources: vec![vertex.path().to_path_buf(), fragment.path().to_path_buf()],
                log: format!(
                    "expected vertex + fragment shaders, got {} + {}",
                    vertex.stage(),
                    fragment.stage()
                ),
            };
            return Err(Runtime::log_and_return_error("glc::program", error));
        }
        Self::link(vec![vertex, fragment])
    }

    /// Link a single compute shader
    ///
    /// # Errors
    ///
    /// Same as [`Program::setup_graphics`].
    pub fn setup_compute(compute: ShaderObject) -> Result<Self> {
        if compute.stage() != ShaderStage::Compute {
            let error = Error::LinkFailed {
                sources: vec![compute.path().to_path_buf()],
                log: format!("expected a compute shader, got {}", compute.stage()),
            };
            return Err(Runtime::log_and_return_error("glc::program", error));
        }
        Self::link(vec![compute])
    }

    /// Allocate, attach, link, check. Consumes the shader objects on every path.
    fn link(shaders: Vec<ShaderObject>) -> Result<Self> {
        let driver = match shaders.first() {
            Some(shader) => shader.driver().clone(),
            None => return Err(Error::LinkFailed { sources: Vec::new(), log: String::new() }),
        };
        let sources: Vec<PathBuf> = shaders.iter().map(|s| s.path().to_path_buf()).collect();

        let id = driver
            .create_program()
            .map_err(|e| Runtime::log_and_return_error("glc::program", e))?;
        let program = Self {
            driver: driver.clone(),
            id,
            stages: shaders.iter().map(|s| s.stage()).collect(),
            sources,
            local_size: shaders.iter().find_map(|s| s.local_size()),
            bindings: BindingTable::new(),
        };

        for shader in &shaders {
            driver.attach_shader(id, shader.id());
        }
        driver.link_program(id);
        let linked = driver.program_link_status(id);

        for shader in &shaders {
            driver.detach_shader(id, shader.id());
        }
        // The linked binary lives in the program; the shader objects go now
        drop(shaders);

        if !linked {
            let error = Error::LinkFailed {
                sources: program.sources.clone(),
                log: driver.program_info_log(id),
            };
            return Err(Runtime::log_and_return_error("glc::program", error));
        }

        glc_info!("glc::program", "Succeeded creating shader program ({})", program.source_list());
        Ok(program)
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Stages linked into this program
    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Whether this program holds a compute stage
    pub fn is_compute(&self) -> bool {
        self.stages.contains(&ShaderStage::Compute)
    }

    /// Literal work-group size of the compute stage
    pub fn local_size(&self) -> Option<[u32; 3]> {
        self.local_size
    }

    pub fn bindings(&self) -> &BindingTable<'b> {
        &self.bindings
    }

    /// Bind `buffer` at `slot` and record it in the binding table
    ///
    /// The program borrows `buffer` until it is dropped, so the buffer
    /// outlives every dispatch that can see it:
    ///
    /// ```compile_fail
    /// use std::sync::Arc;
    /// use glsl_compute::glc::driver::GraphicsDriver;
    /// use glsl_compute::glc::{DispatchGrid, Program, Result, ShaderObject, StorageBuffer};
    ///
    /// fn dispatch_after_drop(driver: &Arc<dyn GraphicsDriver>, shader: ShaderObject) -> Result<()> {
    ///     let buffer = StorageBuffer::new(driver)?;
    ///     let mut program = Program::setup_compute(shader)?;
    ///     program.bind_storage(3, &buffer)?;
    ///     drop(buffer);
    ///     program.dispatch(DispatchGrid::new(1, 1, 1)?)
    /// }
    /// ```
    pub fn bind_storage(&mut self, slot: u32, buffer: &'b StorageBuffer) -> Result<()> {
        buffer.bind(slot)?;
        if let Some(previous) = self.bindings.set(slot, buffer) {
            if previous.id() != buffer.id() {
                glc_trace!(
                    "glc::program",
                    "Slot {} rebound from buffer {} to {}",
                    slot,
                    previous.id().0,
                    buffer.id().0
                );
            }
        }
        Ok(())
    }

    /// Clear a slot of the binding table
    pub fn unbind_storage(&mut self, slot: u32) -> Result<()> {
        if self.bindings.remove(slot).is_some() {
            self.driver
                .bind_buffer_base(slot, None)
                .map_err(|e| Runtime::log_and_return_error("glc::program", e))?;
        }
        Ok(())
    }

    /// Check a host-side work-group size against the compiled local size
    ///
    /// # Errors
    ///
    /// `Error::InvalidDispatch` when the program has no compute stage or its
    /// `local_size_x` differs from `work_group_size`. A local size that is
    /// not a literal cannot be checked and only logs a warning.
    pub fn check_work_group_size(&self, work_group_size: u32) -> Result<()> {
        if !self.is_compute() {
            let error = Error::InvalidDispatch("program has no compute stage".to_string());
            return Err(Runtime::log_and_return_error("glc::program", error));
        }
        match self.local_size {
            Some([x, _, _]) if x != work_group_size => {
                let error = Error::InvalidDispatch(format!(
                    "work group size {} does not match local_size_x = {} of {}",
                    work_group_size,
                    x,
                    self.source_list()
                ));
                Err(Runtime::log_and_return_error("glc::program", error))
            }
            Some(_) => Ok(()),
            None => {
                glc_warn!(
                    "glc::program",
                    "Local size of {} is not a literal, assuming {}",
                    self.source_list(),
                    work_group_size
                );
                Ok(())
            }
        }
    }

    /// Run the program over `grid`
    ///
    /// Makes the program current, re-applies the binding table, dispatches and
    /// issues a shader-storage plus buffer-update barrier so that following
    /// shader accesses and read-backs observe the kernel's writes.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidDispatch` - no compute stage, or the grid exceeds the driver limits
    /// * `Error::BackendError` - the driver rejected one of the calls
    pub fn dispatch(&self, grid: DispatchGrid) -> Result<()> {
        if !self.is_compute() {
            let error = Error::InvalidDispatch("program has no compute stage".to_string());
            return Err(Runtime::log_and_return_error("glc::program", error));
        }
        grid.validate(&self.driver.info())
            .map_err(|e| Runtime::log_and_return_error("glc::program", e))?;

        self.issue(grid).map_err(|e| Runtime::log_and_return_error("glc::program", e))
    }

    fn issue(&self, grid: DispatchGrid) -> Result<()> {
        self.driver.use_program(Some(self.id))?;
        for (slot, buffer) in self.bindings.iter() {
            self.driver.bind_buffer_base(slot, Some(buffer.id()))?;
        }

        glc_debug!(
            "glc::program",
            "Dispatching ({}, {}, {}) work groups with {} bound slot(s)",
            grid.x,
            grid.y,
            grid.z,
            self.bindings.len()
        );
        self.driver.dispatch_compute(grid.x, grid.y, grid.z)?;
        self.driver
            .memory_barrier(MemoryBarrier::SHADER_STORAGE | MemoryBarrier::BUFFER_UPDATE)
    }

    fn source_list(&self) -> String {
        self.sources
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Debug for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("stages", &self.stages)
            .field("sources", &self.sources)
            .field("local_size", &self.local_size)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl Drop for Program<'_> {
    fn drop(&mut self) {
        self.driver.delete_program(self.id);
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
