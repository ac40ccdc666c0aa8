/*!
# GLSL Compute - OpenGL Backend

OpenGL implementation of the `glsl_compute` driver seam.

This crate creates a hidden window and an OpenGL core context with winit and
glutin, loads the entry points with glow, and exposes them through
[`GlDriver`], an implementation of `glsl_compute::glc::driver::GraphicsDriver`.

# Example

```no_run
use glsl_compute_backend_gl::{ContextConfig, GlContext};
use glsl_compute::glc::check_gpu_status;

let context = GlContext::new(ContextConfig::default())?;
let driver = context.driver();
check_gpu_status(driver.as_ref())?;
# Ok::<(), glsl_compute::glc::Error>(())
```
*/

mod gl_context;
mod gl_driver;
#[cfg(feature = "gl-debug")]
mod debug;

pub use gl_context::{ContextConfig, GlContext};
pub use gl_driver::GlDriver;

// Re-export debug utilities
#[cfg(feature = "gl-debug")]
pub use debug::{get_debug_stats, print_debug_stats_report, reset_debug_stats, DebugStats};
