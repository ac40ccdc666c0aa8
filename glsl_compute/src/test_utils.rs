//! Shared helpers for unit tests (no GPU required)

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::driver::mock_driver::{MockDispatch, MockDriver};
use crate::driver::GraphicsDriver;
use crate::log::{LogEntry, Logger};

/// The element-wise vec4 add kernel, slots 1 + 2 -> 3
pub const ADD_KERNEL_SOURCE: &str = r#"#version 430
layout(local_size_x = 256) in;

layout(std430, binding = 1) buffer VectorA { vec4 a[]; };
layout(std430, binding = 2) buffer VectorB { vec4 b[]; };
layout(std430, binding = 3) buffer VectorR { vec4 r[]; };

void main()
{
    uint i = gl_GlobalInvocationID.x;
    r[i] = a[i] + b[i];
}
"#;

/// Compute kernel that leaves its buffers untouched
pub const IDENTITY_KERNEL_SOURCE: &str = r#"#version 430
layout(local_size_x = 64) in;
layout(std430, binding = 0) buffer Data { float data[]; };
void main() { data[gl_GlobalInvocationID.x] = data[gl_GlobalInvocationID.x]; }
"#;

/// Missing semicolon and closing brace
pub const BROKEN_SOURCE: &str = r#"#version 430
layout(local_size_x = 256) in;
void main()
{
    uint i = gl_GlobalInvocationID.x
"#;

pub const VERTEX_SOURCE: &str = r#"#version 430
layout(location = 0) in vec3 position;
void main() { gl_Position = vec4(position, 1.0); }
"#;

pub const FRAGMENT_SOURCE: &str = r#"#version 430
out vec4 color;
void main() { color = vec4(1.0); }
"#;

/// Mock driver plus the trait-object view handed to the harness
pub fn mock_pair(driver: MockDriver) -> (Arc<MockDriver>, Arc<dyn GraphicsDriver>) {
    let mock = Arc::new(driver);
    let dyn_driver: Arc<dyn GraphicsDriver> = mock.clone();
    (mock, dyn_driver)
}

/// CPU version of the vec4 add kernel with a fixed local size
pub fn add_kernel(local_size: u32) -> impl Fn(&mut MockDispatch) + Send + Sync + 'static {
    move |dispatch: &mut MockDispatch| {
        let a = dispatch.f32s(1);
        let b = dispatch.f32s(2);
        let mut r = dispatch.f32s(3);
        let invocations = (dispatch.groups[0] * local_size) as usize;
        for i in 0..invocations {
            for c in 0..4 {
                let idx = i * 4 + c;
                if idx < r.len() && idx < a.len() && idx < b.len() {
                    r[idx] = a[idx] + b[idx];
                }
            }
        }
        dispatch.write_f32s(3, &r);
    }
}

/// Write a shader source into `dir`
pub fn write_shader(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, source).unwrap();
    path
}

/// Logger that keeps every entry for later assertions
pub struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    pub fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
