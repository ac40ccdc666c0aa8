/// StorageBuffer - owning handle to one GPU shader storage buffer
///
/// The buffer is created empty; `allocate` fixes its size and every transfer
/// afterwards must move exactly that many bytes.

use std::fmt;
use std::sync::Arc;
use bytemuck::Pod;

use crate::driver::{BufferId, BufferUsage, GraphicsDriver};
use crate::error::{Error, Result};
use crate::{glc_error, glc_trace};

pub struct StorageBuffer {
    driver: Arc<dyn GraphicsDriver>,
    id: BufferId,
    size: Option<u64>,
    usage: BufferUsage,
}

impl StorageBuffer {
    /// Acquire a driver buffer object
    ///
    /// # Errors
    ///
    /// `Error::ResourceAllocation` when the driver refuses the object.
    pub fn new(driver: &Arc<dyn GraphicsDriver>) -> Result<Self> {
        let id = driver.create_buffer().map_err(|e| {
            glc_error!("glc::buffer", "{}", e);
            e
        })?;
        Ok(Self {
            driver: driver.clone(),
            id,
            size: None,
            usage: BufferUsage::Static,
        })
    }

    /// Reserve `size` bytes, replacing any previous size and contents
    pub fn allocate(&mut self, size: u64, usage: BufferUsage) -> Result<()> {
        self.driver.allocate_buffer(self.id, size, usage).map_err(|e| {
            glc_error!("glc::buffer", "Allocating {} bytes failed: {}", size, e);
            e
        })?;
        glc_trace!("glc::buffer", "Allocated buffer {} ({} bytes, {:?})", self.id.0, size, usage);
        self.size = Some(size);
        self.usage = usage;
        Ok(())
    }

    /// Expose the buffer at a storage slot for the next dispatch
    ///
    /// Binding never transfers ownership; rebinding the slot leaves this
    /// buffer alive.
    pub fn bind(&self, slot: u32) -> Result<()> {
        self.driver.bind_buffer_base(slot, Some(self.id)).map_err(|e| {
            glc_error!("glc::buffer", "Binding buffer {} at slot {} failed: {}", self.id.0, slot, e);
            e
        })
    }

    /// Upload exactly `size()` bytes
    ///
    /// The data store is respecified with streaming usage.
    pub fn copy_in(&mut self, data: &[u8]) -> Result<()> {
        let size = self.checked_len(data.len())?;
        self.driver.upload_buffer(self.id, data, BufferUsage::Stream).map_err(|e| {
            glc_error!("glc::buffer", "Upload of {} bytes failed: {}", size, e);
            e
        })?;
        self.usage = BufferUsage::Stream;
        glc_trace!("glc::buffer", "Uploaded {} bytes to buffer {}", size, self.id.0);
        Ok(())
    }

    /// Download exactly `size()` bytes into `dst`
    pub fn copy_out(&self, dst: &mut [u8]) -> Result<()> {
        let size = self.checked_len(dst.len())?;
        self.driver.read_buffer(self.id, 0, dst).map_err(|e| {
            glc_error!("glc::buffer", "Read-back of {} bytes failed: {}", size, e);
            e
        })?;
        glc_trace!("glc::buffer", "Read {} bytes from buffer {}", size, self.id.0);
        Ok(())
    }

    /// Upload a slice of plain values (tightly packed, native endianness)
    pub fn copy_in_slice<T: Pod>(&mut self, values: &[T]) -> Result<()> {
        self.copy_in(bytemuck::cast_slice(values))
    }

    /// Download into a slice of plain values
    pub fn copy_out_slice<T: Pod>(&self, values: &mut [T]) -> Result<()> {
        self.copy_out(bytemuck::cast_slice_mut(values))
    }

    /// Download the whole buffer as a vector of `T`
    ///
    /// # Errors
    ///
    /// `Error::BufferSizeMismatch` when the size is not a multiple of `size_of::<T>()`.
    pub fn read_to_vec<T: Pod>(&self) -> Result<Vec<T>> {
        let size = self.size.ok_or(Error::BufferNotAllocated)?;
        let elem = std::mem::size_of::<T>().max(1) as u64;
        if size % elem != 0 {
            return Err(Error::BufferSizeMismatch { expected: size, actual: size / elem * elem });
        }
        let mut values = vec![T::zeroed(); (size / elem) as usize];
        self.copy_out_slice(&mut values)?;
        Ok(values)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Byte size, `None` before `allocate`
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Usage hint of the current data store
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn checked_len(&self, len: usize) -> Result<u64> {
        let size = match self.size {
            Some(size) => size,
            None => {
                let error = Error::BufferNotAllocated;
                glc_error!("glc::buffer", "{}", error);
                return Err(error);
            }
        };
        if len as u64 != size {
            let error = Error::BufferSizeMismatch { expected: size, actual: len as u64 };
            glc_error!("glc::buffer", "{}", error);
            return Err(error);
        }
        Ok(size)
    }
}

impl fmt::Debug for StorageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBuffer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("usage", &self.usage)
            .finish()
    }
}

impl Drop for StorageBuffer {
    fn drop(&mut self) {
        self.driver.delete_buffer(self.id);
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
