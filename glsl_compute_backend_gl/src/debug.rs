/// KHR_debug message routing - driver messages into the harness logger
///
/// Installed on debug contexts when the `gl-debug` feature is enabled.
/// Every message is forwarded to the `glc_*` logger and counted per severity;
/// identical messages are grouped so the report can flag repeats.

use colored::*;
use glsl_compute::{glc_debug, glc_info, glc_warn, glc_error};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Global debug statistics (thread-safe atomic counters)
static DEBUG_STATS: DebugStatsTracker = DebugStatsTracker::new();

/// Global message tracker for grouping identical messages
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Snapshot of the debug message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugStats {
    /// DEBUG_SEVERITY_HIGH
    pub errors: u32,
    /// DEBUG_SEVERITY_MEDIUM
    pub warnings: u32,
    /// DEBUG_SEVERITY_LOW
    pub info: u32,
    /// DEBUG_SEVERITY_NOTIFICATION
    pub notifications: u32,
}

impl DebugStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.notifications
    }
}

struct DebugStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    notifications: AtomicU32,
}

impl DebugStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            notifications: AtomicU32::new(0),
        }
    }

    fn get_stats(&self) -> DebugStats {
        DebugStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.notifications.store(0, Ordering::Relaxed);
    }
}

/// Reset counters and the message tracker
pub fn reset_debug_stats() {
    DEBUG_STATS.reset();
    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = Some(FxHashMap::default());
    }
}

/// Current debug message statistics
pub fn get_debug_stats() -> DebugStats {
    DEBUG_STATS.get_stats()
}

/// Print the debug statistics report
pub fn print_debug_stats_report() {
    let stats = get_debug_stats();

    if stats.total() == 0 {
        println!("\n{}", "✓ No driver debug messages".green().bold());
        return;
    }

    println!("\n{}", "=== GL Debug Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.notifications > 0 {
        println!("  {} {}", "Notifications:".bright_black(), stats.notifications);
    }

    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(tracker) = MESSAGE_TRACKER.lock() {
        if let Some(messages) = tracker.as_ref() {
            let repeated = messages.values().filter(|&&count| count > 1).count();
            if repeated > 0 {
                println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), repeated);
            }
        }
    }

    println!("{}\n", "==================================".bright_blue().bold());
}

fn source_name(source: u32) -> &'static str {
    match source {
        glow::DEBUG_SOURCE_API => "API",
        glow::DEBUG_SOURCE_WINDOW_SYSTEM => "Window System",
        glow::DEBUG_SOURCE_SHADER_COMPILER => "Shader Compiler",
        glow::DEBUG_SOURCE_THIRD_PARTY => "Third Party",
        glow::DEBUG_SOURCE_APPLICATION => "Application",
        _ => "Other",
    }
}

fn type_name(gltype: u32) -> &'static str {
    match gltype {
        glow::DEBUG_TYPE_ERROR => "Error",
        glow::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "Deprecated",
        glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "Undefined",
        glow::DEBUG_TYPE_PORTABILITY => "Portability",
        glow::DEBUG_TYPE_PERFORMANCE => "Performance",
        _ => "Other",
    }
}

fn track_message(message: &str) -> u32 {
    match MESSAGE_TRACKER.lock() {
        Ok(mut tracker) => {
            let count = tracker
                .get_or_insert_with(FxHashMap::default)
                .entry(message.to_string())
                .or_insert(0);
            *count += 1;
            *count
        }
        Err(_) => 1,
    }
}

/// KHR_debug callback
///
/// Signature matches `glow::HasContext::debug_message_callback`.
pub fn gl_debug_callback(source: u32, gltype: u32, id: u32, severity: u32, message: &str) {
    let occurrences = track_message(message);
    let repeat = if occurrences > 1 {
        format!(" [×{}]", occurrences)
    } else {
        String::new()
    };
    let text = format!(
        "[{} / {}] #{}{}: {}",
        source_name(source),
        type_name(gltype),
        id,
        repeat,
        message
    );

    match severity {
        glow::DEBUG_SEVERITY_HIGH => {
            DEBUG_STATS.errors.fetch_add(1, Ordering::Relaxed);
            glc_error!("glc::gl", "{}", text);
        }
        glow::DEBUG_SEVERITY_MEDIUM => {
            DEBUG_STATS.warnings.fetch_add(1, Ordering::Relaxed);
            glc_warn!("glc::gl", "{}", text);
        }
        glow::DEBUG_SEVERITY_LOW => {
            DEBUG_STATS.info.fetch_add(1, Ordering::Relaxed);
            glc_info!("glc::gl", "{}", text);
        }
        _ => {
            DEBUG_STATS.notifications.fetch_add(1, Ordering::Relaxed);
            glc_debug!("glc::gl", "{}", text);
        }
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
