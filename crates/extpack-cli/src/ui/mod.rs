//! Terminal UI utilities for status notices and build summaries.
//!
//! Every notice goes to stderr. Colors are decided once by [`init_colors`]
//! from `--no-color`, `NO_COLOR`/`FORCE_COLOR` and terminal detection.
//!
//! # Examples
//!
//! ```no_run
//! use extpack_cli::ui;
//!
//! ui::init_colors(false);
//! ui::info("Watching for changes...");
//! ui::success("Build complete!");
//! ```

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};

use std::sync::atomic::{AtomicBool, Ordering};

static COLORS: AtomicBool = AtomicBool::new(false);

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables, falls back to
/// terminal capability detection.
pub fn should_use_color() -> bool {
    // NO_COLOR environment variable disables colors
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // FORCE_COLOR enables colors even in non-TTY
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Initialize color support. `--no-color` always wins.
///
/// Should be called early in main, before any notice is printed.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled_stderr(enabled);
}

pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
