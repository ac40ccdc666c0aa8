/// GlContext - hidden window + OpenGL core context hosting the compute harness
///
/// Creation sequence:
/// - event loop (optionally usable off the main thread)
/// - hidden window and a GL config picked by glutin-winit
/// - OpenGL core context of the requested version (debug flag optional)
/// - window surface, make current, load entry points into glow

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::event_loop::EventLoop;
use winit::window::Window;

use glsl_compute::glc::driver::{DriverInfo, GraphicsDriver};
use glsl_compute::glc::{Error, Result};
use glsl_compute::{glc_debug, glc_error, glc_info};

use crate::gl_driver::GlDriver;

// ============================================================================
// Configuration
// ============================================================================

/// Context creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Window title
    pub title: String,
    /// Requested OpenGL version (major, minor)
    pub gl_version: (u8, u8),
    /// Show the window (the harness never draws into it)
    pub visible: bool,
    /// Request a debug context and route KHR_debug messages (needs `gl-debug`)
    pub debug_output: bool,
    /// Allow creating the event loop off the main thread (tests)
    pub any_thread: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            title: "Compute Shader Test".to_string(),
            gl_version: (4, 3),
            visible: false,
            debug_output: cfg!(feature = "gl-debug"),
            any_thread: false,
        }
    }
}

// ============================================================================
// Window-side resources
// ============================================================================

/// Surface, context, window and event loop, in drop order
pub(crate) struct WindowContext {
    _surface: Surface<WindowSurface>,
    _context: PossiblyCurrentContext,
    _window: Window,
    _event_loop: EventLoop<()>,
}

// ============================================================================
// GlContext
// ============================================================================

/// Ready-to-use OpenGL context and its driver
pub struct GlContext {
    driver: Arc<GlDriver>,
}

impl GlContext {
    /// Create the window, the context and the driver
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` when any windowing or context step fails.
    pub fn new(config: ContextConfig) -> Result<Self> {
        let event_loop = build_event_loop(&config)?;

        let window_attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_visible(config.visible);
        let template = ConfigTemplateBuilder::new();
        let (window, gl_config) = catch_no_config(|| {
            DisplayBuilder::new()
                .with_window_attributes(Some(window_attributes))
                .build(&event_loop, template, pick_config)
                .map_err(|e| init_error(format!("Display creation failed: {}", e)))
        })?;
        let window = window.ok_or_else(|| init_error("Window creation failed".to_string()))?;

        let raw_window_handle = window
            .window_handle()
            .map_err(|e| init_error(format!("Window handle unavailable: {}", e)))?
            .as_raw();

        let (major, minor) = config.gl_version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .with_profile(GlProfile::Core)
            .with_debug(config.debug_output)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| init_error(format!("OpenGL {}.{} core context creation failed: {}", major, minor, e)))?;

        let surface_attributes = window
            .build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new())
            .map_err(|e| init_error(format!("Surface attributes failed: {}", e)))?;
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|e| init_error(format!("Window surface creation failed: {}", e)))?;

        let context = not_current
            .make_current(&surface)
            .map_err(|e| init_error(format!("Making the context current failed: {}", e)))?;

        #[allow(unused_mut)]
        let mut gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| gl_display.get_proc_address(symbol))
        };

        #[cfg(feature = "gl-debug")]
        if config.debug_output {
            install_debug_callback(&mut gl);
        }

        glc_info!(
            "glc::gl",
            "Created OpenGL {}.{} core context ({}x{} hidden window \"{}\")",
            major,
            minor,
            window.inner_size().width,
            window.inner_size().height,
            config.title
        );

        let window_context = WindowContext {
            _surface: surface,
            _context: context,
            _window: window,
            _event_loop: event_loop,
        };
        let driver = Arc::new(GlDriver::with_window_context(gl, window_context));
        Ok(Self { driver })
    }

    /// Driver handle for the harness
    pub fn driver(&self) -> Arc<dyn GraphicsDriver> {
        self.driver.clone()
    }

    /// Concrete driver (raw glow access)
    pub fn gl_driver(&self) -> &Arc<GlDriver> {
        &self.driver
    }

    pub fn info(&self) -> DriverInfo {
        self.driver.info()
    }
}

/// Panic payload of a config picker that was offered no config
pub(crate) struct NoGlConfig;

/// Lowest multisample count; nothing is ever presented
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    match configs.min_by_key(|c| c.num_samples()) {
        Some(config) => config,
        None => panic::panic_any(NoGlConfig),
    }
}

/// Run a display build, turning an empty config list into `InitializationFailed`
///
/// The glutin-winit picker must return a config, so an empty list can only
/// leave it by unwinding. Any other panic is resumed.
pub(crate) fn catch_no_config<T>(build: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(build)) {
        Ok(result) => result,
        Err(payload) if payload.is::<NoGlConfig>() => {
            Err(init_error("No OpenGL config matches the template".to_string()))
        }
        Err(payload) => panic::resume_unwind(payload),
    }
}

fn init_error(message: String) -> Error {
    glc_error!("glc::gl", "{}", message);
    Error::InitializationFailed(message)
}

fn build_event_loop(config: &ContextConfig) -> Result<EventLoop<()>> {
    #[allow(unused_mut)]
    let mut builder = EventLoop::builder();

    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
    if config.any_thread {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    #[cfg(target_os = "windows")]
    if config.any_thread {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }
    #[cfg(not(any(
        target_os = "windows",
        all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android")))
    )))]
    if config.any_thread {
        glc_debug!("glc::gl", "any_thread is not supported on this platform, ignored");
    }

    let event_loop = builder
        .build()
        .map_err(|e| init_error(format!("Event loop creation failed: {}", e)))?;
    glc_debug!("glc::gl", "Event loop ready (any_thread: {})", config.any_thread);
    Ok(event_loop)
}

#[cfg(feature = "gl-debug")]
fn install_debug_callback(gl: &mut glow::Context) {
    use glow::HasContext;

    let version = gl.version();
    let core_debug = (version.major, version.minor) >= (4, 3);
    if !core_debug && !gl.supported_extensions().contains("GL_KHR_debug") {
        glc_debug!("glc::gl", "KHR_debug unavailable, driver messages not routed");
        return;
    }
    crate::debug::reset_debug_stats();
    unsafe {
        gl.enable(glow::DEBUG_OUTPUT);
        gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
        gl.debug_message_callback(crate::debug::gl_debug_callback);
    }
    glc_debug!("glc::gl", "KHR_debug callback installed");
}

#[cfg(test)]
#[path = "gl_context_tests.rs"]
mod tests;
