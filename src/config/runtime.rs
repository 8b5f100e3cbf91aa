//! Runtime timing configuration
//!
//! Render loop, keyboard polling and demo backend settings. Durations are
//! stored in milliseconds in the file and as `Duration` at runtime.

use serde::Deserialize;
use std::time::Duration;

/// Render loop and shutdown timing
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Quiet period before a burst of state changes triggers a render
    pub debounce: Duration,

    /// Periodic redraw even without state changes (spinners)
    pub tick: Duration,

    /// How often the orchestrator refreshes its statistics snapshot
    pub statistics_interval: Duration,

    /// Upper bound on waiting for loops to stop at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(16),
            tick: Duration::from_millis(250),
            statistics_interval: Duration::from_millis(1000),
            shutdown_timeout: Duration::from_millis(2000),
        }
    }
}

/// Render settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileRender {
    pub debounce_ms: Option<u64>,
    pub tick_ms: Option<u64>,
    pub statistics_interval_ms: Option<u64>,
    pub shutdown_timeout_ms: Option<u64>,
}

impl RenderConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileRender>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            debounce: file
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            // A zero tick would spin the render loop
            tick: file
                .tick_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick),
            statistics_interval: file
                .statistics_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.statistics_interval),
            shutdown_timeout: file
                .shutdown_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }
}

/// Keyboard polling settings
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardConfig {
    /// Sleep between non-blocking polls of the terminal
    pub poll_interval: Duration,

    /// Consecutive read failures tolerated before the pipeline gives up
    pub max_consecutive_errors: u32,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            max_consecutive_errors: 50,
        }
    }
}

/// Keyboard settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileKeyboard {
    pub poll_interval_ms: Option<u64>,
    pub max_consecutive_errors: Option<u32>,
}

impl KeyboardConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileKeyboard>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            poll_interval: file
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_consecutive_errors: file
                .max_consecutive_errors
                .unwrap_or(defaults.max_consecutive_errors),
        }
    }
}

/// Demo backend settings
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Delay between streamed words
    pub token_delay: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            token_delay: Duration::from_millis(35),
        }
    }
}

/// Demo settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileDemo {
    pub token_delay_ms: Option<u64>,
}

impl DemoConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileDemo>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            token_delay: file
                .token_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(Self::default().token_delay),
        }
    }
}
