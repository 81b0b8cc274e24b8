//! Tagged console logging gated by the configured verbosity.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent = 0,
    Summary = 1,
    #[default]
    Normal = 2,
    Verbose = 3,
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_level(level: LogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn level() -> LogLevel {
    match CURRENT_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Silent,
        1 => LogLevel::Summary,
        3 => LogLevel::Verbose,
        _ => LogLevel::Normal,
    }
}

/// Emit a tagged line to stdout/stderr if `at` is at or below the current
/// verbosity. `tag` mirrors the component ("WorldManager", "SaveManager",
/// "JobQueue", ...); `message` should already contain any status emoji.
pub fn log_at(at: LogLevel, tag: &str, message: &str) {
    if at > level() {
        return;
    }
    println!("[{tag}] {message}");
}

pub fn warn(tag: &str, message: &str) {
    eprintln!("[{tag}] ⚠️ WARNING: {message}");
}

pub fn error(tag: &str, message: &str) {
    eprintln!("[{tag}] ❌ {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_normal() {
        assert_eq!(LogLevel::default(), LogLevel::Normal);
    }

    #[test]
    fn ordering_places_silent_lowest() {
        assert!(LogLevel::Silent < LogLevel::Summary);
        assert!(LogLevel::Summary < LogLevel::Normal);
        assert!(LogLevel::Normal < LogLevel::Verbose);
    }
}
