#![deny(missing_docs)]
//! Shared logging utilities for the relay workspace.
//!
//! This crate provides the `relay_*` logging macros used by the coordinator,
//! the per-tab filler and the demo runner, plus a test initializer for the
//! global logger.

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! relay_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! relay_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! relay_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! relay_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! relay_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Shortens a prompt for log lines so large pastes do not flood the log.
pub fn prompt_preview(prompt: &str) -> String {
    const MAX_CHARS: usize = 48;
    let mut preview: String = prompt.chars().take(MAX_CHARS).collect();
    if prompt.chars().count() > MAX_CHARS {
        preview.push_str("...");
    }
    preview.replace('\n', " ")
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::prompt_preview;

    #[test]
    fn preview_truncates_and_flattens() {
        assert_eq!(prompt_preview("short"), "short");
        let long = "a".repeat(60);
        let preview = prompt_preview(&long);
        assert_eq!(preview.len(), 51);
        assert!(preview.ends_with("..."));
        assert_eq!(prompt_preview("line one\nline two"), "line one line two");
    }
}
