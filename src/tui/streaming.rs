// Lifecycle of the assistant response currently on screen
//
// The session drives it; the streaming view and status bar read it. Every
// request ends in a state where `is_processing()` is false.
//
// State Diagram:
//
//                        Increment
//                        ┌──────┐
//                        ▼      │
//   [Idle] ──Request──▶ [Generating] ──Complete──▶ [Idle]
//     ▲                      │
//     │                      ├──Cancel───▶ [Cancelled]
//     │                      │
//     │                      └──Failure──▶ [Failed]
//     │                                        │
//     └──────────── Request (from any state) ◀─┘
//
// Cancel/Failure outside Generating are ignored: there is nothing in flight.

use serde::Serialize;

/// Where the current response is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StreamingState {
    #[default]
    Idle,
    /// Response is streaming in
    Generating,
    /// Last response was interrupted by the user
    Cancelled,
    /// Last response failed in the backend
    Failed,
}

impl StreamingState {
    /// Only Generating blocks new submissions
    pub fn is_processing(self) -> bool {
        self == StreamingState::Generating
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamingState::Idle => "ready",
            StreamingState::Generating => "generating",
            StreamingState::Cancelled => "cancelled",
            StreamingState::Failed => "failed",
        }
    }
}

/// State machine for the streaming indicator
///
/// Each method represents an event that can trigger a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingStateMachine {
    state: StreamingState,
    /// Increments received for the current response
    increments: usize,
}

impl StreamingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> StreamingState {
        self.state
    }

    pub fn increments(&self) -> usize {
        self.increments
    }

    /// Request sent to the backend
    pub fn on_request(&mut self) {
        self.state = StreamingState::Generating;
        self.increments = 0;
    }

    /// A text increment arrived; informational outside Generating
    pub fn on_increment(&mut self) {
        if self.state == StreamingState::Generating {
            self.increments += 1;
        }
    }

    /// Stream ended normally
    pub fn on_complete(&mut self) {
        if self.state == StreamingState::Generating {
            self.state = StreamingState::Idle;
        }
    }

    /// User interrupted the stream
    pub fn on_cancel(&mut self) {
        if self.state == StreamingState::Generating {
            self.state = StreamingState::Cancelled;
        }
    }

    /// Backend reported an error
    pub fn on_failure(&mut self) {
        if self.state == StreamingState::Generating {
            self.state = StreamingState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let sm = StreamingStateMachine::new();
        assert_eq!(sm.state(), StreamingState::Idle);
        assert!(!sm.state().is_processing());
    }

    #[test]
    fn test_complete_flow() {
        let mut sm = StreamingStateMachine::new();
        sm.on_request();
        assert!(sm.state().is_processing());

        sm.on_increment();
        sm.on_increment();
        assert_eq!(sm.increments(), 2);

        sm.on_complete();
        assert_eq!(sm.state(), StreamingState::Idle);
    }

    #[test]
    fn test_cancel_and_failure_leave_processing() {
        let mut sm = StreamingStateMachine::new();
        sm.on_request();
        sm.on_cancel();
        assert_eq!(sm.state(), StreamingState::Cancelled);
        assert!(!sm.state().is_processing());

        sm.on_request();
        assert_eq!(sm.increments(), 0);
        sm.on_failure();
        assert_eq!(sm.state(), StreamingState::Failed);
        assert!(!sm.state().is_processing());
    }

    #[test]
    fn test_events_outside_generating_are_ignored() {
        let mut sm = StreamingStateMachine::new();
        sm.on_cancel();
        sm.on_failure();
        sm.on_increment();
        assert_eq!(sm.state(), StreamingState::Idle);
        assert_eq!(sm.increments(), 0);

        // A late cancel after completion must not flip the result
        sm.on_request();
        sm.on_complete();
        sm.on_cancel();
        assert_eq!(sm.state(), StreamingState::Idle);
    }
}
