//! Focus target trait for components that own keyboard input
//!
//! The keyboard pipeline never touches components. The orchestrator routes
//! typed key events to whichever component currently holds focus, through
//! this capability interface, instead of looking up a concrete type.

use super::Component;
use crossterm::event::{KeyCode, KeyModifiers};

/// Result of handling a key event
///
/// Tells the orchestrator whether the component consumed the event or
/// if it should fall through to the remaining handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Event was consumed by the component
    Yes,
    /// Event was not handled, should bubble up
    No,
}

impl Handled {
    /// Create from a boolean (true = handled)
    pub fn from_bool(handled: bool) -> Self {
        if handled {
            Self::Yes
        } else {
            Self::No
        }
    }

    /// Check if the event was handled
    pub fn was_handled(self) -> bool {
        self == Self::Yes
    }
}

impl From<bool> for Handled {
    fn from(handled: bool) -> Self {
        Self::from_bool(handled)
    }
}

/// Cursor / selection movement requested by a navigation key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

impl Navigation {
    /// Map a key code to a navigation, if it is one
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Left => Some(Self::Left),
            KeyCode::Right => Some(Self::Right),
            KeyCode::Up => Some(Self::Up),
            KeyCode::Down => Some(Self::Down),
            KeyCode::Home => Some(Self::Home),
            KeyCode::End => Some(Self::End),
            KeyCode::PageUp => Some(Self::PageUp),
            KeyCode::PageDown => Some(Self::PageDown),
            _ => None,
        }
    }
}

/// Capability of a component that can hold logical focus
///
/// # Event Flow
///
/// ```text
/// KeyboardPipeline
///    │  global bindings (Ctrl+C, ...)
///    │  CharacterTyped / KeyPressed / KeyCombinationPressed
///    ▼
/// Application (focus router)
///    │
///    ▼
/// Focused component (via FocusTarget)
///    │
///    │ returns Handled::Yes or Handled::No
///    ▼
/// Remaining subscribers (skipped once handled)
/// ```
pub trait FocusTarget: Component {
    /// Insert a printable character at the cursor
    fn insert_char(&self, ch: char);

    /// Delete the character before the cursor (Backspace)
    fn delete_backward(&self);

    /// Delete the character under the cursor (Delete)
    fn delete_forward(&self);

    /// Move the cursor or selection
    fn navigate(&self, nav: Navigation) -> Handled;

    /// Submit the buffered content (Enter). Returns what was submitted.
    fn submit(&self) -> Option<String>;

    /// Discard the buffered content (Escape)
    fn clear(&self) -> Handled {
        Handled::No
    }

    /// Fallback for keys the router has no mapping for
    fn handle_key(&self, _code: KeyCode, _modifiers: KeyModifiers) -> Handled {
        Handled::No
    }

    /// Hint text for the status bar while this component is focused
    fn focus_hint(&self) -> Option<&'static str> {
        None
    }
}
