//! Component trait system for the TUI runtime
//!
//! This module defines the contracts that UI components implement.
//! The renderer only knows about [`Component`]; the focus router only
//! knows about [`FocusTarget`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Application                            │
//! │   (orchestrator: registers components, routes focus)        │
//! └─────────────────────────────────────────────────────────────┘
//!               │                               │
//!               ▼                               ▼
//!        ┌─────────────┐                 ┌─────────────┐
//!        │  Renderer   │                 │  Keyboard   │
//!        │ static/dyn  │                 │  pipeline   │
//!        └─────────────┘                 └─────────────┘
//!               │                               │
//!               └──────────────┬────────────────┘
//!                              ▼
//!                  Component (+ FocusTarget)
//! ```

mod component;
mod interactive;

pub use component::{Component, ComponentId, RenderContext, Zone};
pub use interactive::{FocusTarget, Handled, Navigation};
