/// Work-group grid of a compute dispatch

use crate::driver::DriverInfo;
use crate::error::{Error, Result};

/// Number of work groups launched per dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchGrid {
    /// Grid with explicit group counts
    ///
    /// # Errors
    ///
    /// `Error::InvalidDispatch` when any count is zero.
    pub fn new(x: u32, y: u32, z: u32) -> Result<Self> {
        if x == 0 || y == 0 || z == 0 {
            return Err(Error::InvalidDispatch(format!(
                "work group counts must be non-zero, got ({}, {}, {})",
                x, y, z
            )));
        }
        Ok(Self { x, y, z })
    }

    /// One-dimensional grid covering `elements` invocations exactly
    ///
    /// `elements` must be a non-zero multiple of `work_group_size`: the
    /// kernel has no bounds check, so a remainder would either be skipped or
    /// read past the end of the buffers.
    pub fn for_elements(elements: u32, work_group_size: u32) -> Result<Self> {
        if work_group_size == 0 {
            return Err(Error::InvalidDispatch("work group size must be non-zero".to_string()));
        }
        if elements == 0 {
            return Err(Error::InvalidDispatch("nothing to dispatch (0 elements)".to_string()));
        }
        if elements % work_group_size != 0 {
            return Err(Error::InvalidDispatch(format!(
                "{} elements are not a multiple of the work group size {}",
                elements, work_group_size
            )));
        }
        Self::new(elements / work_group_size, 1, 1)
    }

    /// Check the grid against the driver's per-dimension maximum
    pub fn validate(&self, info: &DriverInfo) -> Result<()> {
        let counts = [self.x, self.y, self.z];
        for (axis, (count, max)) in counts.iter().zip(info.max_work_group_count.iter()).enumerate() {
            if count > max {
                return Err(Error::InvalidDispatch(format!(
                    "{} work groups on axis {} exceed the driver maximum {}",
                    count, axis, max
                )));
            }
        }
        Ok(())
    }

    /// Total number of work groups
    pub fn group_count(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
