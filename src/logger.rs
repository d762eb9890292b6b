//! Terminal logging with coloured module prefixes.
//!
//! ```ignore
//! log!("build"; "rendered {} page(s)", count);
//! log!("warn"; "template {} not found", name);
//! ```

use colored::{ColoredString, Colorize};
use std::io::{Write, stderr, stdout};

/// Log a message with a coloured `[module]` prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Write one log line. Warnings and errors go to stderr.
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    if matches!(module_lower.as_str(), "warn" | "error") {
        let mut err = stderr().lock();
        writeln!(err, "{prefix} {message}").ok();
    } else {
        let mut out = stdout().lock();
        writeln!(out, "{prefix} {message}").ok();
        out.flush().ok();
    }
}

#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" => prefix.bright_blue().bold(),
        "watch" => prefix.bright_green().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}
