//! Category-gated logging for the sound engine.
//!
//! Chip code logs from hot paths (register writes, timer expiries), so every
//! message is built lazily and only after a cheap atomic level check. Messages
//! that pass the gate go out through the `log` facade with a per-category
//! target, so whichever logger the host installs (the CLI uses `env_logger`)
//! decides where they end up.
//!
//! # Architecture
//!
//! - **LogConfig**: global per-category levels held in atomics
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: Channels, Timers, Interrupts, Serial, Pots, Registers
//! - **log()**: the single entry point used by the chip
//!
//! # Usage
//!
//! ```rust
//! use pokey_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Timers, LogLevel::Debug, || {
//!     format!("timer 1 expired at tick {}", 1234)
//! });
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    /// Matching `log` crate level; `Off` has none.
    pub fn to_log_level(self) -> Option<::log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(::log::Level::Error),
            LogLevel::Warn => Some(::log::Level::Warn),
            LogLevel::Info => Some(::log::Level::Info),
            LogLevel::Debug => Some(::log::Level::Debug),
            LogLevel::Trace => Some(::log::Level::Trace),
        }
    }
}

/// Log category for the chip's subsystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Divisor and volume recomputes
    Channels,
    /// Timer arming and expiry
    Timers,
    /// IRQ status changes and callbacks
    Interrupts,
    /// SEROUT/SERIN and keyboard
    Serial,
    /// Paddle conversions
    Pots,
    /// Raw register traffic
    Registers,
}

impl LogCategory {
    pub const ALL: [LogCategory; 6] = [
        LogCategory::Channels,
        LogCategory::Timers,
        LogCategory::Interrupts,
        LogCategory::Serial,
        LogCategory::Pots,
        LogCategory::Registers,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Channels => 0,
            LogCategory::Timers => 1,
            LogCategory::Interrupts => 2,
            LogCategory::Serial => 3,
            LogCategory::Pots => 4,
            LogCategory::Registers => 5,
        }
    }

    /// `log` target used for this category
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Channels => "pokey::channels",
            LogCategory::Timers => "pokey::timers",
            LogCategory::Interrupts => "pokey::interrupts",
            LogCategory::Serial => "pokey::serial",
            LogCategory::Pots => "pokey::pots",
            LogCategory::Registers => "pokey::registers",
        }
    }

    /// Parse a category name (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "channels" | "audio" => Some(LogCategory::Channels),
            "timers" => Some(LogCategory::Timers),
            "interrupts" | "irq" => Some(LogCategory::Interrupts),
            "serial" => Some(LogCategory::Serial),
            "pots" | "paddles" => Some(LogCategory::Pots),
            "registers" | "regs" => Some(LogCategory::Registers),
            _ => None,
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    /// Applies to every category without its own level
    global_level: AtomicU8,
    category_levels: [AtomicU8; 6],
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: std::array::from_fn(|_| AtomicU8::new(LogLevel::Off as u8)),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category with its own level uses it; otherwise the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }
}

/// Log a message with the specified category and level.
///
/// `message_fn` only runs when the category is enabled at `level`.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    if !LogConfig::global().should_log(category, level) {
        return;
    }
    if let Some(lvl) = level.to_log_level() {
        ::log::log!(target: category.target(), lvl, "{}", message_fn());
    }
}
