//! Layout calculation and responsive breakpoints
//!
//! [`LayoutCalculator`] maps a terminal size onto two stacked zones:
//!
//! ```text
//! ┌──────────── terminal (clamped to >= 60x20) ────────────┐
//! │ top margin                                             │
//! │  ┌──────────────── static zone ───────────────────┐    │
//! │  │ transcript                                     │    │
//! │  └────────────────────────────────────────────────┘    │
//! │  ┌──────────────── dynamic zone ──────────────────┐    │
//! │  │ streaming output / input / status              │    │
//! │  └────────────────────────────────────────────────┘    │
//! │ bottom margin                                          │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! The calculation itself is a pure function of size and configuration.

use crate::config::{LayoutConfig, MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH};
use parking_lot::RwLock;
use ratatui::layout::{Rect, Size};
use serde::Serialize;

/// Origin and extent of one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneConstraints {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl ZoneConstraints {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Outcome of one layout request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutResult {
    /// Size the zones were computed for (after clamping to the minimum)
    pub terminal_width: u16,
    pub terminal_height: u16,
    /// Whether the real terminal was below the enforced minimum
    pub clamped: bool,
    pub static_zone: ZoneConstraints,
    pub dynamic_zone: ZoneConstraints,
    pub available_width: u16,
    pub available_height: u16,
}

/// Split a terminal of `size` according to `config`
pub fn compute_layout(size: Size, config: &LayoutConfig) -> LayoutResult {
    let width = size.width.max(MIN_TERMINAL_WIDTH);
    let height = size.height.max(MIN_TERMINAL_HEIGHT);
    let clamped = width != size.width || height != size.height;

    // LayoutConfig validation guarantees at least 2 rows and 1 column here
    let available_width = width - config.left_margin() - config.right_margin();
    let available_height = height - config.top_margin() - config.bottom_margin();

    let mut static_height = (f64::from(available_height) * config.static_ratio()).round() as u16;
    if let Some(max) = config.maximum_static_height() {
        static_height = static_height.min(max);
    }
    static_height = static_height.max(config.minimum_static_height());

    // Dynamic minimum wins over the static share, but never takes every row
    let mut dynamic_height = available_height.saturating_sub(static_height);
    if dynamic_height < config.minimum_dynamic_height() {
        dynamic_height = config.minimum_dynamic_height().min(available_height - 1);
        static_height = available_height - dynamic_height;
    }

    static_height = static_height.clamp(1, available_height - 1);
    dynamic_height = available_height - static_height;

    let x = config.left_margin();
    let y = config.top_margin();

    LayoutResult {
        terminal_width: width,
        terminal_height: height,
        clamped,
        static_zone: ZoneConstraints {
            x,
            y,
            width: available_width,
            height: static_height,
        },
        dynamic_zone: ZoneConstraints {
            x,
            y: y + static_height,
            width: available_width,
            height: dynamic_height,
        },
        available_width,
        available_height,
    }
}

/// Holds the active layout configuration
///
/// Configuration swaps only affect later `calculate` calls; results already
/// handed out are plain values and never change.
pub struct LayoutCalculator {
    config: RwLock<LayoutConfig>,
}

impl LayoutCalculator {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    pub fn calculate(&self, size: Size) -> LayoutResult {
        compute_layout(size, &self.config.read())
    }

    pub fn update_configuration(&self, config: LayoutConfig) {
        tracing::debug!(
            "Layout configuration updated: static ratio {:.2}",
            config.static_ratio()
        );
        *self.config.write() = config;
    }

    pub fn configuration(&self) -> LayoutConfig {
        self.config.read().clone()
    }
}

impl Default for LayoutCalculator {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

/// Responsive breakpoint system for TUI layout decisions.
///
/// Single source of truth for width thresholds - no magic numbers scattered in render code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Breakpoint {
    /// < 80 cols: only the essentials fit on one status line
    Compact,
    /// 80-119 cols
    Normal,
    /// 120+ cols: room for full statistics
    Wide,
}

impl Breakpoint {
    pub fn from_width(width: u16) -> Self {
        match width {
            0..=79 => Breakpoint::Compact,
            80..=119 => Breakpoint::Normal,
            _ => Breakpoint::Wide,
        }
    }

    /// Check if at least this breakpoint (inclusive)
    pub fn at_least(&self, min: Breakpoint) -> bool {
        *self >= min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(result: &LayoutResult) {
        assert_eq!(
            result.static_zone.height + result.dynamic_zone.height,
            result.available_height,
            "zones must fill the available height: {result:?}"
        );
        assert!(result.static_zone.height >= 1);
        assert!(result.dynamic_zone.height >= 1);
        assert_eq!(
            result.dynamic_zone.y,
            result.static_zone.y + result.static_zone.height
        );
    }

    #[test]
    fn test_invariants_hold_across_sizes() {
        let configs = [
            LayoutConfig::default(),
            LayoutConfig::builder()
                .ratios(0.9, 0.1)
                .minimum_dynamic_height(8)
                .build()
                .unwrap(),
            LayoutConfig::builder()
                .ratios(0.1, 0.9)
                .minimum_static_height(30)
                .build()
                .unwrap(),
            LayoutConfig::builder()
                .ratios(0.5, 0.5)
                .maximum_static_height(Some(4))
                .margins(2, 3, 1, 3)
                .build()
                .unwrap(),
        ];

        for config in &configs {
            for width in [60u16, 80, 133, 250] {
                for height in 20u16..=120 {
                    let result = compute_layout(Size::new(width, height), config);
                    assert_invariants(&result);
                    assert!(!result.clamped);
                }
            }
        }
    }

    #[test]
    fn test_small_terminal_is_clamped() {
        let result = compute_layout(Size::new(10, 5), &LayoutConfig::default());
        assert!(result.clamped);
        assert_eq!(result.terminal_width, MIN_TERMINAL_WIDTH);
        assert_eq!(result.terminal_height, MIN_TERMINAL_HEIGHT);
        assert_eq!(result.available_height, MIN_TERMINAL_HEIGHT);
        assert_invariants(&result);

        let same = compute_layout(
            Size::new(MIN_TERMINAL_WIDTH, MIN_TERMINAL_HEIGHT),
            &LayoutConfig::default(),
        );
        assert_eq!(result.static_zone, same.static_zone);
        assert_eq!(result.dynamic_zone, same.dynamic_zone);
    }

    #[test]
    fn test_ratio_split_and_margins() {
        let config = LayoutConfig::builder()
            .ratios(0.75, 0.25)
            .margins(1, 2, 1, 2)
            .build()
            .unwrap();
        let result = compute_layout(Size::new(100, 42), &config);

        assert_eq!(result.available_width, 96);
        assert_eq!(result.available_height, 40);
        assert_eq!(result.static_zone.height, 30);
        assert_eq!(result.dynamic_zone.height, 10);
        assert_eq!((result.static_zone.x, result.static_zone.y), (2, 1));
        assert_eq!(result.dynamic_zone.y, 31);
    }

    #[test]
    fn test_maximum_static_height_gives_rows_to_dynamic() {
        let config = LayoutConfig::builder()
            .maximum_static_height(Some(10))
            .build()
            .unwrap();
        let result = compute_layout(Size::new(80, 50), &config);
        assert_eq!(result.static_zone.height, 10);
        assert_eq!(result.dynamic_zone.height, 40);
    }

    #[test]
    fn test_minimum_dynamic_height_takes_rows_from_static() {
        let config = LayoutConfig::builder()
            .ratios(0.95, 0.05)
            .minimum_dynamic_height(6)
            .build()
            .unwrap();
        let result = compute_layout(Size::new(80, 30), &config);
        assert_eq!(result.dynamic_zone.height, 6);
        assert_eq!(result.static_zone.height, 24);
    }

    #[test]
    fn test_configuration_update_is_not_retroactive() {
        let calculator = LayoutCalculator::default();
        let before = calculator.calculate(Size::new(80, 40));

        calculator.update_configuration(LayoutConfig::builder().ratios(0.5, 0.5).build().unwrap());
        let after = calculator.calculate(Size::new(80, 40));

        assert_eq!(before.static_zone.height, 28);
        assert_eq!(after.static_zone.height, 20);
        assert_eq!(calculator.configuration().static_ratio(), 0.5);
    }

    #[test]
    fn breakpoint_thresholds() {
        assert_eq!(Breakpoint::from_width(60), Breakpoint::Compact);
        assert_eq!(Breakpoint::from_width(79), Breakpoint::Compact);
        assert_eq!(Breakpoint::from_width(80), Breakpoint::Normal);
        assert_eq!(Breakpoint::from_width(119), Breakpoint::Normal);
        assert_eq!(Breakpoint::from_width(120), Breakpoint::Wide);
    }

    #[test]
    fn at_least_comparisons() {
        let normal = Breakpoint::Normal;
        assert!(normal.at_least(Breakpoint::Compact));
        assert!(normal.at_least(Breakpoint::Normal));
        assert!(!normal.at_least(Breakpoint::Wide));
    }
}
