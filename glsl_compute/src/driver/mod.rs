/// Driver module - the seam between the harness and a graphics driver

// Module declarations
pub mod graphics_driver;

// Re-export everything from graphics_driver.rs
pub use graphics_driver::*;

// Mock graphics driver for tests (no GPU required)
#[cfg(test)]
pub mod mock_driver;
