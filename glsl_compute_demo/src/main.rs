//! GLSL compute demo - element-wise add of two vec4 arrays on the GPU
//!
//! Creates a hidden-window OpenGL 4.3 context, checks compute support, runs
//! the add kernel once and prints `i: a + b = r` for every element.
//! Any failure is reported here and turns into exit code 1.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use glsl_compute::glc::{check_gpu_status, Result, Runtime};
use glsl_compute::vector_add;
use glsl_compute::{glc_error, glc_info, glc_warn};
use glsl_compute_backend_gl::GlContext;

use cli::DemoArgs;

fn main() -> ExitCode {
    let args = DemoArgs::parse();
    Runtime::set_min_severity(args.log_level.into());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            glc_error!("glc::demo", "Aborting: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &DemoArgs) -> Result<()> {
    let context = GlContext::new(args.context_config())?;
    let driver = context.driver();
    check_gpu_status(driver.as_ref())?;

    let config = args.vector_add_config();
    let report = vector_add::run(&driver, &config)?;

    if !args.quiet {
        for (i, a, b, r) in report.elements() {
            println!("{}: {:.6} + {:.6} = {:.6}", i, a, b, r);
        }
    }

    let mismatches = report.mismatches();
    if mismatches.is_empty() {
        glc_info!("glc::demo", "All {} elements verified", config.element_count());
    } else {
        glc_warn!(
            "glc::demo",
            "{} of {} elements differ from a + b (first at {})",
            mismatches.len(),
            config.element_count(),
            mismatches[0]
        );
    }

    #[cfg(feature = "gl-debug")]
    glsl_compute_backend_gl::print_debug_stats_report();

    Ok(())
}
