//! Layout configuration: zone ratios, minimums and margins
//!
//! A `LayoutConfig` can only be obtained through [`LayoutConfigBuilder::build`],
//! which validates it. Invalid ratios or minimums are rejected here and never
//! reach the layout calculator.

use serde::Deserialize;
use thiserror::Error;

/// Terminals smaller than this are laid out as if they were this size
pub const MIN_TERMINAL_WIDTH: u16 = 60;
pub const MIN_TERMINAL_HEIGHT: u16 = 20;

/// Tolerance when checking that the ratios sum to one
const RATIO_EPSILON: f64 = 1e-6;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutConfigError {
    #[error("{name} ratio must be within 0.0..=1.0, got {value}")]
    RatioOutOfRange { name: &'static str, value: f64 },

    #[error("static and dynamic ratios must sum to 1.0, got {sum}")]
    RatiosDoNotSumToOne { sum: f64 },

    #[error("minimum {zone} height must be at least 1")]
    NonPositiveMinimum { zone: &'static str },

    #[error("maximum static height {maximum} is below the minimum static height {minimum}")]
    MaximumBelowMinimum { maximum: u16, minimum: u16 },

    #[error(
        "top + bottom margins ({margins}) leave fewer than 2 rows at the minimum terminal height {MIN_TERMINAL_HEIGHT}"
    )]
    VerticalMarginsTooLarge { margins: u16 },

    #[error(
        "left + right margins ({margins}) leave no columns at the minimum terminal width {MIN_TERMINAL_WIDTH}"
    )]
    HorizontalMarginsTooLarge { margins: u16 },
}

// ─────────────────────────────────────────────────────────────────────────────
// Validated configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Validated split of the terminal between the static and dynamic zones
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    static_ratio: f64,
    dynamic_ratio: f64,
    minimum_static_height: u16,
    minimum_dynamic_height: u16,
    maximum_static_height: Option<u16>,
    top_margin: u16,
    bottom_margin: u16,
    left_margin: u16,
    right_margin: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            static_ratio: 0.7,
            dynamic_ratio: 0.3,
            minimum_static_height: 3,
            minimum_dynamic_height: 5,
            maximum_static_height: None,
            top_margin: 0,
            bottom_margin: 0,
            left_margin: 0,
            right_margin: 0,
        }
    }
}

impl LayoutConfig {
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }

    /// Start a builder pre-filled with this configuration
    pub fn to_builder(&self) -> LayoutConfigBuilder {
        LayoutConfigBuilder {
            config: self.clone(),
        }
    }

    pub fn static_ratio(&self) -> f64 {
        self.static_ratio
    }

    pub fn dynamic_ratio(&self) -> f64 {
        self.dynamic_ratio
    }

    pub fn minimum_static_height(&self) -> u16 {
        self.minimum_static_height
    }

    pub fn minimum_dynamic_height(&self) -> u16 {
        self.minimum_dynamic_height
    }

    pub fn maximum_static_height(&self) -> Option<u16> {
        self.maximum_static_height
    }

    pub fn top_margin(&self) -> u16 {
        self.top_margin
    }

    pub fn bottom_margin(&self) -> u16 {
        self.bottom_margin
    }

    pub fn left_margin(&self) -> u16 {
        self.left_margin
    }

    pub fn right_margin(&self) -> u16 {
        self.right_margin
    }

    /// Create from file config with defaults, validating the result
    pub fn from_file(file: Option<FileLayout>) -> Result<Self, LayoutConfigError> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let mut builder = defaults.to_builder();
        // A lone ratio implies its complement
        match (file.static_ratio, file.dynamic_ratio) {
            (Some(s), Some(d)) => builder = builder.ratios(s, d),
            (Some(s), None) => builder = builder.ratios(s, 1.0 - s),
            (None, Some(d)) => builder = builder.ratios(1.0 - d, d),
            (None, None) => {}
        }

        builder
            .minimum_static_height(
                file.minimum_static_height
                    .unwrap_or(defaults.minimum_static_height),
            )
            .minimum_dynamic_height(
                file.minimum_dynamic_height
                    .unwrap_or(defaults.minimum_dynamic_height),
            )
            .maximum_static_height(file.maximum_static_height.or(defaults.maximum_static_height))
            .top_margin(file.top_margin.unwrap_or(defaults.top_margin))
            .bottom_margin(file.bottom_margin.unwrap_or(defaults.bottom_margin))
            .left_margin(file.left_margin.unwrap_or(defaults.left_margin))
            .right_margin(file.right_margin.unwrap_or(defaults.right_margin))
            .build()
    }
}

/// Layout settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLayout {
    pub static_ratio: Option<f64>,
    pub dynamic_ratio: Option<f64>,
    pub minimum_static_height: Option<u16>,
    pub minimum_dynamic_height: Option<u16>,
    pub maximum_static_height: Option<u16>,
    pub top_margin: Option<u16>,
    pub bottom_margin: Option<u16>,
    pub left_margin: Option<u16>,
    pub right_margin: Option<u16>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LayoutConfigBuilder {
    config: LayoutConfig,
}

impl LayoutConfigBuilder {
    pub fn ratios(mut self, static_ratio: f64, dynamic_ratio: f64) -> Self {
        self.config.static_ratio = static_ratio;
        self.config.dynamic_ratio = dynamic_ratio;
        self
    }

    pub fn minimum_static_height(mut self, rows: u16) -> Self {
        self.config.minimum_static_height = rows;
        self
    }

    pub fn minimum_dynamic_height(mut self, rows: u16) -> Self {
        self.config.minimum_dynamic_height = rows;
        self
    }

    pub fn maximum_static_height(mut self, rows: Option<u16>) -> Self {
        self.config.maximum_static_height = rows;
        self
    }

    pub fn top_margin(mut self, rows: u16) -> Self {
        self.config.top_margin = rows;
        self
    }

    pub fn bottom_margin(mut self, rows: u16) -> Self {
        self.config.bottom_margin = rows;
        self
    }

    pub fn left_margin(mut self, cols: u16) -> Self {
        self.config.left_margin = cols;
        self
    }

    pub fn right_margin(mut self, cols: u16) -> Self {
        self.config.right_margin = cols;
        self
    }

    /// Set all four margins (CSS order: top, right, bottom, left)
    pub fn margins(self, top: u16, right: u16, bottom: u16, left: u16) -> Self {
        self.top_margin(top)
            .right_margin(right)
            .bottom_margin(bottom)
            .left_margin(left)
    }

    pub fn build(self) -> Result<LayoutConfig, LayoutConfigError> {
        let c = self.config;

        for (name, value) in [("static", c.static_ratio), ("dynamic", c.dynamic_ratio)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LayoutConfigError::RatioOutOfRange { name, value });
            }
        }
        let sum = c.static_ratio + c.dynamic_ratio;
        if (sum - 1.0).abs() > RATIO_EPSILON {
            return Err(LayoutConfigError::RatiosDoNotSumToOne { sum });
        }

        if c.minimum_static_height == 0 {
            return Err(LayoutConfigError::NonPositiveMinimum { zone: "static" });
        }
        if c.minimum_dynamic_height == 0 {
            return Err(LayoutConfigError::NonPositiveMinimum { zone: "dynamic" });
        }
        if let Some(maximum) = c.maximum_static_height {
            if maximum < c.minimum_static_height {
                return Err(LayoutConfigError::MaximumBelowMinimum {
                    maximum,
                    minimum: c.minimum_static_height,
                });
            }
        }

        let vertical = c.top_margin.saturating_add(c.bottom_margin);
        if vertical > MIN_TERMINAL_HEIGHT - 2 {
            return Err(LayoutConfigError::VerticalMarginsTooLarge { margins: vertical });
        }
        let horizontal = c.left_margin.saturating_add(c.right_margin);
        if horizontal >= MIN_TERMINAL_WIDTH {
            return Err(LayoutConfigError::HorizontalMarginsTooLarge {
                margins: horizontal,
            });
        }

        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let built = LayoutConfig::builder().build();
        assert_eq!(built, Ok(LayoutConfig::default()));
    }

    #[test]
    fn test_ratios_must_sum_to_one() {
        let err = LayoutConfig::builder().ratios(0.6, 0.6).build().unwrap_err();
        assert!(matches!(err, LayoutConfigError::RatiosDoNotSumToOne { .. }));
    }

    #[test]
    fn test_ratio_out_of_range() {
        let err = LayoutConfig::builder().ratios(1.5, -0.5).build().unwrap_err();
        assert_eq!(
            err,
            LayoutConfigError::RatioOutOfRange {
                name: "static",
                value: 1.5
            }
        );

        let err = LayoutConfig::builder()
            .ratios(f64::NAN, 0.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, LayoutConfigError::RatioOutOfRange { .. }));
    }

    #[test]
    fn test_zero_minimums_rejected() {
        assert_eq!(
            LayoutConfig::builder().minimum_static_height(0).build(),
            Err(LayoutConfigError::NonPositiveMinimum { zone: "static" })
        );
        assert_eq!(
            LayoutConfig::builder().minimum_dynamic_height(0).build(),
            Err(LayoutConfigError::NonPositiveMinimum { zone: "dynamic" })
        );
    }

    #[test]
    fn test_maximum_below_minimum_rejected() {
        let err = LayoutConfig::builder()
            .minimum_static_height(6)
            .maximum_static_height(Some(4))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            LayoutConfigError::MaximumBelowMinimum {
                maximum: 4,
                minimum: 6
            }
        );
    }

    #[test]
    fn test_margins_must_leave_room() {
        assert!(matches!(
            LayoutConfig::builder().margins(10, 0, 9, 0).build(),
            Err(LayoutConfigError::VerticalMarginsTooLarge { margins: 19 })
        ));
        assert!(matches!(
            LayoutConfig::builder().margins(0, 30, 0, 30).build(),
            Err(LayoutConfigError::HorizontalMarginsTooLarge { margins: 60 })
        ));
        assert!(LayoutConfig::builder().margins(9, 29, 9, 30).build().is_ok());
    }

    #[test]
    fn test_from_file_infers_complement_ratio() {
        let file = FileLayout {
            static_ratio: Some(0.25),
            ..Default::default()
        };
        let config = LayoutConfig::from_file(Some(file)).unwrap();
        assert_eq!(config.static_ratio(), 0.25);
        assert_eq!(config.dynamic_ratio(), 0.75);
    }

    #[test]
    fn test_from_file_rejects_invalid_section() {
        let file = FileLayout {
            static_ratio: Some(0.5),
            dynamic_ratio: Some(0.2),
            ..Default::default()
        };
        assert!(LayoutConfig::from_file(Some(file)).is_err());
    }
}
