/// Shader compiler - source loading and shader object compilation
///
/// A `ShaderObject` only exists in the compiled state: every failure path
/// releases the driver object before returning the error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::{GraphicsDriver, ShaderId, ShaderStage};
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::glc_debug;

// ============================================================================
// ShaderSource
// ============================================================================

/// Source text of one shader stage
///
/// Read fully into memory once and consumed by compilation.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    path: PathBuf,
    stage: ShaderStage,
    text: String,
}

impl ShaderSource {
    /// Read a whole source file
    ///
    /// # Errors
    ///
    /// `Error::SourceRead` with the path and the OS reason.
    pub fn from_file(path: impl AsRef<Path>, stage: ShaderStage) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|e| Error::SourceRead {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { path, stage, text })
    }

    /// In-memory source; `label` stands in for the path in diagnostics
    pub fn from_text(label: impl Into<PathBuf>, stage: ShaderStage, text: impl Into<String>) -> Self {
        Self { path: label.into(), stage, text: text.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Work-group size declared by a compute source
    ///
    /// Missing `local_size_y`/`local_size_z` count as 1. `None` when
    /// `local_size_x` is absent or not an integer literal (macro,
    /// specialization constant).
    pub fn local_size(&self) -> Option<[u32; 3]> {
        parse_local_size(&self.text)
    }
}

fn parse_local_size(text: &str) -> Option<[u32; 3]> {
    let code = text
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");

    let x = layout_value(&code, "local_size_x")??;
    let y = match layout_value(&code, "local_size_y") {
        Some(value) => value?,
        None => 1,
    };
    let z = match layout_value(&code, "local_size_z") {
        Some(value) => value?,
        None => 1,
    };
    Some([x, y, z])
}

/// `None` when `name` does not occur, `Some(None)` when its value is not a literal
fn layout_value(code: &str, name: &str) -> Option<Option<u32>> {
    let start = code.find(name)? + name.len();
    let value = code[start..]
        .trim_start()
        .strip_prefix('=')
        .map(str::trim_start)
        .and_then(|rest| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        });
    Some(value)
}

// ============================================================================
// ShaderObject
// ============================================================================

/// Owning handle to a compiled driver-side shader
pub struct ShaderObject {
    driver: Arc<dyn GraphicsDriver>,
    id: ShaderId,
    stage: ShaderStage,
    path: PathBuf,
    log: Option<String>,
    local_size: Option<[u32; 3]>,
}

impl ShaderObject {
    /// Wrap a freshly created id so that it is released on every path
    fn new(driver: Arc<dyn GraphicsDriver>, id: ShaderId, stage: ShaderStage, path: PathBuf) -> Self {
        Self { driver, id, stage, path, log: None, local_size: None }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Path (or label) of the source this object was compiled from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compile status as reported by the driver
    pub fn compile_status(&self) -> bool {
        self.driver.shader_compile_status(self.id)
    }

    /// Driver diagnostics of the compilation, absent when the driver logged nothing
    pub fn info_log(&self) -> Option<&str> {
        self.log.as_deref()
    }

    /// Literal work-group size of a compute shader, see [`ShaderSource::local_size`]
    pub fn local_size(&self) -> Option<[u32; 3]> {
        self.local_size
    }

    pub(crate) fn driver(&self) -> &Arc<dyn GraphicsDriver> {
        &self.driver
    }
}

impl fmt::Debug for ShaderObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderObject")
            .field("id", &self.id)
            .field("stage", &self.stage)
            .field("path", &self.path)
            .field("log", &self.log)
            .field("local_size", &self.local_size)
            .finish()
    }
}

impl Drop for ShaderObject {
    fn drop(&mut self) {
        self.driver.delete_shader(self.id);
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// Compile the shader stored at `path`
///
/// The shader object is requested before the file is read, so an unreadable
/// file still releases it.
///
/// # Errors
///
/// * `Error::ResourceAllocation` - the driver refused a shader object
/// * `Error::SourceRead` - the file could not be read
/// * `Error::CompilationFailed` - the driver rejected the source
pub fn compile_shader(
    driver: &Arc<dyn GraphicsDriver>,
    stage: ShaderStage,
    path: impl AsRef<Path>,
) -> Result<ShaderObject> {
    let path = path.as_ref();
    let shader = create_object(driver, stage, path)?;

    let source = ShaderSource::from_file(path, stage)
        .map_err(|e| Runtime::log_and_return_error("glc::shader", e))?;

    compile_into(shader, source.text())
}

/// Compile an in-memory source
///
/// # Errors
///
/// Same as [`compile_shader`], minus `Error::SourceRead`.
pub fn compile_source(driver: &Arc<dyn GraphicsDriver>, source: &ShaderSource) -> Result<ShaderObject> {
    let shader = create_object(driver, source.stage(), source.path())?;
    compile_into(shader, source.text())
}

fn create_object(driver: &Arc<dyn GraphicsDriver>, stage: ShaderStage, path: &Path) -> Result<ShaderObject> {
    let id = driver
        .create_shader(stage)
        .map_err(|e| Runtime::log_and_return_error("glc::shader", e))?;
    Ok(ShaderObject::new(driver.clone(), id, stage, path.to_path_buf()))
}

fn compile_into(mut shader: ShaderObject, text: &str) -> Result<ShaderObject> {
    let driver = shader.driver.clone();
    driver.shader_source(shader.id, text);
    driver.compile_shader(shader.id);

    let log = driver.shader_info_log(shader.id);

    if !driver.shader_compile_status(shader.id) {
        let error = Error::CompilationFailed {
            path: shader.path.clone(),
            stage: shader.stage,
            log,
        };
        // shader dropped here, releasing the driver object
        return Err(Runtime::log_and_return_error("glc::shader", error));
    }

    glc_debug!(
        "glc::shader",
        "Compiled {} shader {}",
        shader.stage,
        shader.path.display()
    );
    if shader.stage == ShaderStage::Compute {
        shader.local_size = parse_local_size(text);
    }
    let trimmed = log.trim();
    if !trimmed.is_empty() {
        shader.log = Some(trimmed.to_string());
    }
    Ok(shader)
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
