//! `[logging]` section and the rolling file appender it describes

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// How often the JSON log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    /// Lenient: anything unrecognised means daily
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Filter level for this crate's targets (trace .. error)
    pub level: String,
    /// JSON logs on disk in addition to the in-memory buffer / stdout
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: dirs::data_local_dir()
                .map(|dir| dir.join("chatterm").join("logs"))
                .unwrap_or_else(|| PathBuf::from("./logs")),
            file_rotation: LogRotation::Daily,
            file_prefix: "chatterm".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<String>,
    pub file_rotation: Option<String>,
    pub file_prefix: Option<String>,
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let Some(file) = file else {
            return Self::default();
        };
        let mut config = Self::default();

        if let Some(level) = file.level {
            config.level = level;
        }
        if let Some(enabled) = file.file_enabled {
            config.file_enabled = enabled;
        }
        if let Some(dir) = file.file_dir {
            config.file_dir = PathBuf::from(dir);
        }
        if let Some(rotation) = file.file_rotation.as_deref() {
            config.file_rotation = LogRotation::parse(rotation);
        }
        if let Some(prefix) = file.file_prefix {
            config.file_prefix = prefix;
        }
        config
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("chatterm={}", self.level)
    }

    /// Create the log directory and a rolling appender inside it
    pub fn rolling_appender(&self) -> Result<RollingFileAppender> {
        std::fs::create_dir_all(&self.file_dir)
            .with_context(|| format!("could not create log directory {}", self.file_dir.display()))?;

        RollingFileAppender::builder()
            .rotation(self.file_rotation.rotation())
            .filename_prefix(&self.file_prefix)
            .build(&self.file_dir)
            .context("could not open log file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_parse_is_lenient() {
        assert_eq!(LogRotation::parse(" Hourly "), LogRotation::Hourly);
        assert_eq!(LogRotation::parse("NEVER"), LogRotation::Never);
        assert_eq!(LogRotation::parse("fortnightly"), LogRotation::Daily);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = LoggingConfig::from_file(Some(FileLogging {
            level: Some("debug".into()),
            ..Default::default()
        }));
        assert_eq!(config.filter_directive(), "chatterm=debug");
        assert_eq!(config.file_prefix, "chatterm");
        assert!(!config.file_enabled);
    }
}
