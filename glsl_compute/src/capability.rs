/// GPU status check run once after context creation

use crate::driver::{DriverInfo, GraphicsDriver};
use crate::error::{Error, Result};
use crate::{glc_error, glc_info};

/// Minimum context version offering compute shaders
pub const COMPUTE_MIN_VERSION: (u32, u32) = (4, 3);

/// Log the driver's identity and verify that GLSL compute shaders are usable
///
/// # Errors
///
/// `Error::InitializationFailed` when the shading language or compute
/// shaders are not supported by the current context.
pub fn check_gpu_status(driver: &dyn GraphicsDriver) -> Result<DriverInfo> {
    let info = driver.info();

    glc_info!("glc::capability", "Vendor: {}", info.vendor);
    glc_info!("glc::capability", "Renderer: {}", info.renderer);
    glc_info!("glc::capability", "Version: {}", info.version);
    glc_info!(
        "glc::capability",
        "OpenGL version {}.{}",
        info.version_number.0,
        info.version_number.1
    );
    glc_info!("glc::capability", "GLSL version: {}", info.glsl_version);
    glc_info!(
        "glc::capability",
        "Max compute work groups: ({}, {}, {})",
        info.max_work_group_count[0],
        info.max_work_group_count[1],
        info.max_work_group_count[2]
    );

    if !info.supports_glsl {
        let error = Error::InitializationFailed("GLSL is not supported by this context".to_string());
        glc_error!("glc::capability", "{}", error);
        return Err(error);
    }
    glc_info!("glc::capability", "GLSL supported");

    if !info.supports_compute || info.version_number < COMPUTE_MIN_VERSION {
        let error = Error::InitializationFailed(format!(
            "compute shaders require OpenGL {}.{} (context is {}.{})",
            COMPUTE_MIN_VERSION.0, COMPUTE_MIN_VERSION.1, info.version_number.0, info.version_number.1
        ));
        glc_error!("glc::capability", "{}", error);
        return Err(error);
    }
    glc_info!("glc::capability", "Compute shaders supported");

    Ok(info)
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
