//! Reactive primitives
//!
//! - [`StateCell`]: a single observable value, equal writes are no-ops
//! - [`EffectRegistry`]: keyed actions gated on dependency changes
//! - [`StateCoordinator`]: collects change notifications from any thread and
//!   debounces them into a single "changes ready" signal for the renderer

pub mod coordinator;
pub mod effect;
pub mod state;

pub use coordinator::{StateCoordinator, DEFAULT_DEBOUNCE};
pub use effect::EffectRegistry;
pub use state::StateCell;
