use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use glsl_compute::glc::log::LogSeverity;
use glsl_compute::glc::VectorAddConfig;
use glsl_compute_backend_gl::ContextConfig;

/// Shader shipped with the demo
pub const DEFAULT_SHADER: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/vec_add.comp");

/// Add two vec4 arrays with a GLSL compute shader and print the result
#[derive(Parser, Debug)]
#[command(name = "glsl_compute_demo", version, about)]
pub struct DemoArgs {
    /// Compute shader source (local_size_x must match --work-group-size)
    #[arg(long, default_value = DEFAULT_SHADER)]
    pub shader: PathBuf,

    /// Number of vec4 elements per operand
    #[arg(long, default_value_t = 1024)]
    pub vectors: u32,

    /// Invocations per work group (must equal the shader's local_size_x)
    #[arg(long, default_value_t = 256)]
    pub work_group_size: u32,

    /// Do not print the per-element lines
    #[arg(long, short)]
    pub quiet: bool,

    /// Show the (otherwise hidden) window
    #[arg(long)]
    pub visible: bool,

    /// Minimum severity of log messages
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LogSeverity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LogSeverity::Trace,
            LogLevel::Debug => LogSeverity::Debug,
            LogLevel::Info => LogSeverity::Info,
            LogLevel::Warn => LogSeverity::Warn,
            LogLevel::Error => LogSeverity::Error,
        }
    }
}

impl DemoArgs {
    pub fn vector_add_config(&self) -> VectorAddConfig {
        VectorAddConfig {
            vector_count: self.vectors,
            work_group_size: self.work_group_size,
            shader_path: self.shader.clone(),
            ..VectorAddConfig::default()
        }
    }

    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            visible: self.visible,
            ..ContextConfig::default()
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
