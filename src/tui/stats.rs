//! Render and application statistics snapshots
//!
//! Snapshots are plain values. Consumers replace their "current" copy and
//! never mutate an old one.

use crate::tui::app::AppState;
use crate::tui::keyboard::KeyboardStatistics;
use serde::Serialize;
use tokio::time::Instant;

/// FPS / render-time thresholds for `performing_well`
const HEALTHY_FPS: f64 = 30.0;
const HEALTHY_RENDER_MS: f64 = 32.0;

/// Smoothing factor for the frame-rate moving average
const FPS_ALPHA: f64 = 0.2;

/// Snapshot published after every render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RenderStatistics {
    pub total_frames: u64,
    /// Wall time of the last pass
    pub last_render_ms: f64,
    /// Exponential moving average over frame intervals
    pub current_fps: f64,
    pub static_components: usize,
    pub dynamic_components: usize,
    /// Components re-rendered in the last pass
    pub rerendered: usize,
    /// Components that failed (error placeholder shown) in the last pass
    pub failed: usize,
}

/// Frame-rate estimator
#[derive(Debug, Default)]
pub struct FpsTracker {
    last_frame: Option<Instant>,
    fps: f64,
}

impl FpsTracker {
    /// Record a frame at `now` and return the smoothed rate
    pub fn record(&mut self, now: Instant) -> f64 {
        if let Some(prev) = self.last_frame.replace(now) {
            let interval = now.saturating_duration_since(prev).as_secs_f64();
            if interval > 0.0 {
                let instant = 1.0 / interval;
                self.fps = if self.fps == 0.0 {
                    instant
                } else {
                    FPS_ALPHA * instant + (1.0 - FPS_ALPHA) * self.fps
                };
            }
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

/// Coarse classification of how many components are alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn from_component_count(count: usize) -> Self {
        match count {
            0..=9 => Self::Low,
            10..=49 => Self::Medium,
            50..=99 => Self::High,
            _ => Self::Critical,
        }
    }
}

pub fn performing_well(fps: f64, last_render_ms: f64) -> bool {
    fps > HEALTHY_FPS && last_render_ms < HEALTHY_RENDER_MS
}

/// Point-in-time application snapshot for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct AppStatistics {
    pub state: AppState,
    pub current_fps: f64,
    pub total_frames: u64,
    pub last_render_ms: f64,
    pub pending_changes: usize,
    pub component_count: usize,
    pub performing_well: bool,
    pub memory_pressure: MemoryPressure,
    pub keyboard: KeyboardStatistics,
    pub uptime_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_memory_pressure_thresholds() {
        assert_eq!(MemoryPressure::from_component_count(0), MemoryPressure::Low);
        assert_eq!(MemoryPressure::from_component_count(9), MemoryPressure::Low);
        assert_eq!(MemoryPressure::from_component_count(10), MemoryPressure::Medium);
        assert_eq!(MemoryPressure::from_component_count(49), MemoryPressure::Medium);
        assert_eq!(MemoryPressure::from_component_count(50), MemoryPressure::High);
        assert_eq!(MemoryPressure::from_component_count(99), MemoryPressure::High);
        assert_eq!(MemoryPressure::from_component_count(100), MemoryPressure::Critical);
    }

    #[test]
    fn test_performing_well_needs_both_conditions() {
        assert!(performing_well(60.0, 5.0));
        assert!(!performing_well(30.0, 5.0));
        assert!(!performing_well(60.0, 32.0));
    }

    #[test]
    fn test_fps_tracker_smooths_toward_new_rate() {
        let start = Instant::now();
        let mut tracker = FpsTracker::default();

        assert_eq!(tracker.record(start), 0.0);
        // 10ms interval -> 100 fps seeds the average
        let fps = tracker.record(start + Duration::from_millis(10));
        assert!((fps - 100.0).abs() < 1e-6);

        // 20ms interval -> 50 fps, blended at alpha 0.2
        let fps = tracker.record(start + Duration::from_millis(30));
        assert!((fps - 90.0).abs() < 1e-6);
        assert_eq!(tracker.fps(), fps);
    }

    #[test]
    fn test_memory_pressure_serializes_lowercase() {
        let json = serde_json::to_string(&MemoryPressure::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
