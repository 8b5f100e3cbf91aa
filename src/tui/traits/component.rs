//! Core component trait - the foundation of the UI system
//!
//! Every renderable, stateful element implements `Component`.
//! This trait provides identity, rendering, the stale-check and the
//! lifecycle hooks the orchestrator calls around the application run.

use super::FocusTarget;
use ratatui::layout::Rect;
use ratatui::text::Text;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a component
///
/// Assigned once at construction from a process-wide counter and stable for
/// the component's lifetime. Used for:
/// - Dirty tracking in the state coordinator
/// - Focus tracking (which component receives input)
/// - Registry membership checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh process-unique id
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Render region a component is registered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Zone {
    /// Content that rarely changes (completed transcript)
    Static,
    /// Content that changes nearly every tick (streaming output, input, status)
    Dynamic,
}

impl Zone {
    pub fn name(&self) -> &'static str {
        match self {
            Zone::Static => "static",
            Zone::Dynamic => "dynamic",
        }
    }
}

/// Immutable context passed to components during rendering
///
/// Components only see what they need - no access to the renderer or
/// other components.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Zone being composed
    pub zone: Zone,

    /// Rectangle allocated to the zone for this frame
    pub area: Rect,

    /// Frame counter (for spinners, blinking cursors)
    pub frame: u64,

    /// Which component currently has focus
    pub focused: Option<ComponentId>,
}

impl RenderContext {
    pub fn new(zone: Zone, area: Rect, frame: u64, focused: Option<ComponentId>) -> Self {
        Self {
            zone,
            area,
            frame,
            focused,
        }
    }

    /// Check if a component is currently focused
    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.focused == Some(id)
    }

    /// Get spinner character for current animation frame
    pub fn spinner_char(&self) -> char {
        const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        SPINNER[(self.frame as usize) % SPINNER.len()]
    }

    /// Usable width in columns
    pub fn width(&self) -> u16 {
        self.area.width
    }
}

/// Base trait for all UI components
///
/// A component renders itself into styled text; the renderer decides where
/// that text lands. Rendering takes `&self`: mutable state lives in
/// [`StateCell`](crate::reactive::StateCell)s owned by the component, so a
/// component can be shared between the renderer and the focus router.
///
/// # Example
///
/// ```ignore
/// struct Banner {
///     base: ComponentBase,
/// }
///
/// impl Component for Banner {
///     fn id(&self) -> ComponentId {
///         self.base.id()
///     }
///
///     fn name(&self) -> &str {
///         "banner"
///     }
///
///     fn render(&self, _ctx: &RenderContext) -> anyhow::Result<Text<'static>> {
///         Ok(Text::raw("hello"))
///     }
/// }
/// ```
pub trait Component: Send + Sync {
    /// Unique identifier for this component
    fn id(&self) -> ComponentId;

    /// Human-readable name used in logs and error placeholders
    fn name(&self) -> &str;

    /// Render the component in isolation
    ///
    /// An `Err` (or a panic) only affects this component: the renderer
    /// substitutes an error placeholder and keeps going.
    fn render(&self, ctx: &RenderContext) -> anyhow::Result<Text<'static>>;

    /// Stale-check: does this component need re-rendering this pass?
    ///
    /// Defaults to `true`, which is always correct but re-renders every pass.
    /// This is the performance opt-in point: override it with a cheap equality
    /// check on the data that feeds `render` (a revision counter, a length).
    /// Components with pending coordinator notifications are re-rendered
    /// regardless of what this returns.
    fn should_update(&self) -> bool {
        true
    }

    /// Called once when the application starts (or on late registration)
    fn mount(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called at shutdown or explicit unregistration
    fn unmount(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources. Must be idempotent.
    fn dispose(&self) {}

    /// Capability hook: components that can own keyboard focus return themselves
    fn focus_target(&self) -> Option<&dyn FocusTarget> {
        None
    }
}
