// Key repeat filter for the keyboard pipeline
//
// Terminals without the kitty keyboard protocol never send release events,
// and holding a key produces a stream of presses. The filter decides which
// presses reach classification:
// - Once keys (Enter, Esc, Tab) are debounced: after one fires, further
//   presses are dropped until the key is released or 150ms have passed.
//   Without release events that includes a deliberate second press inside
//   the window, such as a fast Esc Esc
// - Repeating keys fire on press, then at an interval after a delay
// - Everything else passes straight through; fast typing never drops a key

use crossterm::event::KeyCode;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A second press of a once key this long after the first counts as new
const ONCE_REARM: Duration = Duration::from_millis(150);

/// How a held key is allowed to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Fire once, then drop presses until release or `ONCE_REARM` elapses
    Once,
    /// Fire on press, then every `interval` once held for `delay`
    Repeat { delay: Duration, interval: Duration },
}

impl RepeatPolicy {
    /// Paging through long output
    pub const PAGING: Self = Self::Repeat {
        delay: Duration::from_millis(300),
        interval: Duration::from_millis(30),
    };
}

/// Press bookkeeping for a key that is currently down
#[derive(Debug, Clone, Copy)]
struct Held {
    since: Instant,
    fired: Instant,
}

#[derive(Debug)]
struct Tracked {
    policy: RepeatPolicy,
    held: Option<Held>,
}

#[derive(Debug, Default)]
pub struct RepeatFilter {
    keys: HashMap<KeyCode, Tracked>,
}

impl RepeatFilter {
    /// No keys filtered
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter/Esc/Tab fire once, PageUp/PageDown repeat
    pub fn for_chat_input() -> Self {
        let mut filter = Self::new();
        for code in [KeyCode::Enter, KeyCode::Esc, KeyCode::Tab, KeyCode::BackTab] {
            filter.set_policy(code, RepeatPolicy::Once);
        }
        for code in [KeyCode::PageUp, KeyCode::PageDown] {
            filter.set_policy(code, RepeatPolicy::PAGING);
        }
        filter
    }

    pub fn set_policy(&mut self, code: KeyCode, policy: RepeatPolicy) {
        self.keys.insert(code, Tracked { policy, held: None });
    }

    /// Whether this press should be dispatched
    pub fn accept_press(&mut self, code: KeyCode) -> bool {
        let Some(tracked) = self.keys.get_mut(&code) else {
            return true;
        };
        let now = Instant::now();

        let Some(held) = tracked.held.as_mut() else {
            tracked.held = Some(Held {
                since: now,
                fired: now,
            });
            return true;
        };

        let fire = match tracked.policy {
            RepeatPolicy::Once => now.duration_since(held.fired) >= ONCE_REARM,
            RepeatPolicy::Repeat { delay, interval } => {
                now.duration_since(held.since) >= delay
                    && now.duration_since(held.fired) >= interval
            }
        };
        if fire {
            held.fired = now;
        }
        fire
    }

    /// The key went up; its next press fires immediately
    pub fn release(&mut self, code: KeyCode) {
        if let Some(tracked) = self.keys.get_mut(&code) {
            tracked.held = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_once_key_fires_per_release() {
        let mut filter = RepeatFilter::new();
        filter.set_policy(KeyCode::Enter, RepeatPolicy::Once);

        assert!(filter.accept_press(KeyCode::Enter));
        assert!(!filter.accept_press(KeyCode::Enter));
        assert!(!filter.accept_press(KeyCode::Enter));

        filter.release(KeyCode::Enter);
        assert!(filter.accept_press(KeyCode::Enter));
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_key_rearms_without_release() {
        let mut filter = RepeatFilter::for_chat_input();

        assert!(filter.accept_press(KeyCode::Enter));
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!filter.accept_press(KeyCode::Enter));
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(filter.accept_press(KeyCode::Enter));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_second_esc_is_debounced() {
        let mut filter = RepeatFilter::for_chat_input();

        // Two deliberate presses 80ms apart, no release events
        assert!(filter.accept_press(KeyCode::Esc));
        tokio::time::advance(Duration::from_millis(80)).await;
        assert!(!filter.accept_press(KeyCode::Esc));

        // With release events the second press gets through
        filter.release(KeyCode::Esc);
        assert!(filter.accept_press(KeyCode::Esc));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_waits_for_delay_then_interval() {
        let mut filter = RepeatFilter::new();
        filter.set_policy(
            KeyCode::PageDown,
            RepeatPolicy::Repeat {
                delay: Duration::from_millis(100),
                interval: Duration::from_millis(50),
            },
        );

        assert!(filter.accept_press(KeyCode::PageDown));
        assert!(!filter.accept_press(KeyCode::PageDown));

        tokio::time::advance(Duration::from_millis(110)).await;
        assert!(filter.accept_press(KeyCode::PageDown));

        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(!filter.accept_press(KeyCode::PageDown));

        tokio::time::advance(Duration::from_millis(40)).await;
        assert!(filter.accept_press(KeyCode::PageDown));
    }

    #[test]
    fn test_untracked_keys_always_pass() {
        let mut filter = RepeatFilter::for_chat_input();
        for _ in 0..3 {
            assert!(filter.accept_press(KeyCode::Char('l')));
            assert!(filter.accept_press(KeyCode::Left));
            assert!(filter.accept_press(KeyCode::Backspace));
        }
        // Releasing an untracked key is harmless
        filter.release(KeyCode::Char('l'));
    }
}
