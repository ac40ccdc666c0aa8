/// Vector add - the end-to-end compute dispatch
///
/// Builds two operand vectors and a zeroed result on the host, moves them into
/// three storage buffers, runs the add kernel and reads the result back.

use std::path::PathBuf;
use std::sync::Arc;
use glam::Vec4;

use crate::buffer::StorageBuffer;
use crate::dispatch::DispatchGrid;
use crate::driver::{BufferUsage, GraphicsDriver, ShaderStage};
use crate::error::Result;
use crate::program::Program;
use crate::shader::compile_shader;
use crate::glc_debug;

// ============================================================================
// Configuration
// ============================================================================

/// Parameters of a vector add run
///
/// `work_group_size` sizes the dispatch grid and must match the
/// `local_size_x` declared by the shader; `run` rejects a mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorAddConfig {
    /// Number of 4-component vectors per operand
    pub vector_count: u32,
    /// Invocations per work group
    pub work_group_size: u32,
    /// Compute shader source file
    pub shader_path: PathBuf,
    /// Storage slot of operand A
    pub slot_a: u32,
    /// Storage slot of operand B
    pub slot_b: u32,
    /// Storage slot of the result
    pub slot_result: u32,
}

impl VectorAddConfig {
    /// Components per vector (vec4 in the shader)
    pub const COMPONENTS: usize = 4;

    /// Number of f32 elements per operand
    pub fn element_count(&self) -> usize {
        self.vector_count as usize * Self::COMPONENTS
    }

    /// Byte size of each storage buffer
    pub fn buffer_size(&self) -> u64 {
        (self.element_count() * std::mem::size_of::<f32>()) as u64
    }
}

impl Default for VectorAddConfig {
    fn default() -> Self {
        Self {
            vector_count: 1024,
            work_group_size: 256,
            shader_path: PathBuf::from("vec_add.comp"),
            slot_a: 1,
            slot_b: 2,
            slot_result: 3,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Host copies of the operands and the read-back result
#[derive(Debug, Clone, PartialEq)]
pub struct VectorAddReport {
    pub a: Vec<Vec4>,
    pub b: Vec<Vec4>,
    pub result: Vec<Vec4>,
}

impl VectorAddReport {
    /// `(i, a[i], b[i], r[i])` for every f32 element, in order
    pub fn elements(&self) -> impl Iterator<Item = (usize, f32, f32, f32)> + '_ {
        let a: &[f32] = bytemuck::cast_slice(&self.a);
        let b: &[f32] = bytemuck::cast_slice(&self.b);
        let r: &[f32] = bytemuck::cast_slice(&self.result);
        a.iter()
            .zip(b)
            .zip(r)
            .enumerate()
            .map(|(i, ((a, b), r))| (i, *a, *b, *r))
    }

    /// Element indices where `r[i] != a[i] + b[i]`
    pub fn mismatches(&self) -> Vec<usize> {
        self.elements()
            .filter(|(_, a, b, r)| a + b != *r)
            .map(|(i, ..)| i)
            .collect()
    }
}

// ============================================================================
// Run
// ============================================================================

/// Operand A: `A[i] = i % 3` over the flattened f32 elements
pub fn seed_a(vector_count: u32) -> Vec<Vec4> {
    seed(vector_count, 3)
}

/// Operand B: `B[i] = i % 7` over the flattened f32 elements
pub fn seed_b(vector_count: u32) -> Vec<Vec4> {
    seed(vector_count, 7)
}

fn seed(vector_count: u32, modulus: usize) -> Vec<Vec4> {
    (0..vector_count as usize)
        .map(|v| {
            let base = v * VectorAddConfig::COMPONENTS;
            Vec4::new(
                (base % modulus) as f32,
                ((base + 1) % modulus) as f32,
                ((base + 2) % modulus) as f32,
                ((base + 3) % modulus) as f32,
            )
        })
        .collect()
}

/// Run the add kernel once on the seeded operands
///
/// # Errors
///
/// Any error of the steps involved: an invalid grid or a work-group size
/// that disagrees with the shader, a refused driver object, an unreadable or
/// rejected shader, a failed link, dispatch or transfer.
pub fn run(driver: &Arc<dyn GraphicsDriver>, config: &VectorAddConfig) -> Result<VectorAddReport> {
    let grid = DispatchGrid::for_elements(config.vector_count, config.work_group_size)?;

    let a = seed_a(config.vector_count);
    let b = seed_b(config.vector_count);
    let mut result = vec![Vec4::ZERO; config.vector_count as usize];

    let size = config.buffer_size();
    let mut buffer_a = StorageBuffer::new(driver)?;
    let mut buffer_b = StorageBuffer::new(driver)?;
    let mut buffer_r = StorageBuffer::new(driver)?;
    for buffer in [&mut buffer_a, &mut buffer_b, &mut buffer_r] {
        buffer.allocate(size, BufferUsage::Dynamic)?;
    }
    buffer_a.copy_in_slice(&a)?;
    buffer_b.copy_in_slice(&b)?;
    buffer_r.copy_in_slice(&result)?;
    glc_debug!("glc::vector_add", "Uploaded 3 x {} bytes", size);

    let shader = compile_shader(driver, ShaderStage::Compute, &config.shader_path)?;
    let mut program = Program::setup_compute(shader)?;
    program.check_work_group_size(config.work_group_size)?;

    program.bind_storage(config.slot_a, &buffer_a)?;
    program.bind_storage(config.slot_b, &buffer_b)?;
    program.bind_storage(config.slot_result, &buffer_r)?;

    program.dispatch(grid)?;

    buffer_r.copy_out_slice(&mut result)?;

    Ok(VectorAddReport { a, b, result })
}

#[cfg(test)]
#[path = "vector_add_tests.rs"]
mod tests;
