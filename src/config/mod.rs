//! Configuration for the chat terminal
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/chatterm/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! Validation happens here: a `Config` that loaded successfully only holds
//! values the runtime can use as-is.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod layout;
mod observability;
mod runtime;
mod serialization;


pub use layout::{
    FileLayout, LayoutConfig, LayoutConfigBuilder, LayoutConfigError, MIN_TERMINAL_HEIGHT,
    MIN_TERMINAL_WIDTH,
};
pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use runtime::{DemoConfig, FileDemo, FileKeyboard, FileRender, KeyboardConfig, RenderConfig};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Static/dynamic zone split
    pub layout: LayoutConfig,

    /// Render loop timing
    pub render: RenderConfig,

    /// Keyboard polling
    pub keyboard: KeyboardConfig,

    pub logging: LoggingConfig,

    /// Demo backend pacing
    pub demo: DemoConfig,
}

/// Config file structure, every field optional
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub layout: Option<FileLayout>,
    pub render: Option<FileRender>,
    pub keyboard: Option<FileKeyboard>,
    pub logging: Option<FileLogging>,
    pub demo: Option<FileDemo>,
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/chatterm/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("chatterm").join("config.toml"))
    }

    /// Write the default template if no config file exists yet
    ///
    /// Returns the path when a file was created.
    pub fn ensure_config_exists() -> Result<Option<PathBuf>> {
        let Some(path) = Self::config_path() else {
            return Ok(None);
        };
        if path.exists() {
            return Ok(None);
        }
        Self::write_defaults(&path)?;
        Ok(Some(path))
    }

    /// Overwrite `path` with the default template
    pub fn write_defaults(path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(path, Self::default().to_toml())
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Load configuration: env vars > config file > defaults
    pub fn load() -> Result<(Self, ConfigSource)> {
        let (file, source) = match Self::config_path() {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    let file = Self::parse(&contents)
                        .with_context(|| format!("parsing {}", path.display()))?;
                    (file, ConfigSource::File(path))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    (FileConfig::default(), ConfigSource::Defaults)
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("reading {}", path.display()));
                }
            },
            None => (FileConfig::default(), ConfigSource::Defaults),
        };

        let config = Self::resolve(file, |key| std::env::var(key).ok())
            .context("invalid [layout] section")?;
        Ok((config, source))
    }

    pub(crate) fn parse(contents: &str) -> Result<FileConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Merge file settings with environment overrides
    pub(crate) fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LayoutConfigError> {
        let env_ms = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());

        let layout = LayoutConfig::from_file(file.layout)?;

        let mut render = RenderConfig::from_file(file.render);
        if let Some(ms) = env_ms("CHATTERM_DEBOUNCE_MS") {
            render.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = env_ms("CHATTERM_TICK_MS").filter(|ms| *ms > 0) {
            render.tick = Duration::from_millis(ms);
        }

        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(level) = env("CHATTERM_LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            logging.level = level;
        }

        let mut demo = DemoConfig::from_file(file.demo);
        if let Some(ms) = env_ms("CHATTERM_TOKEN_DELAY_MS") {
            demo.token_delay = Duration::from_millis(ms);
        }

        Ok(Self {
            layout,
            render,
            keyboard: KeyboardConfig::from_file(file.keyboard),
            logging,
            demo,
        })
    }
}
