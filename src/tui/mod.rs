// TUI module - Terminal User Interface runtime
//
// This module turns component state into terminal frames. It handles:
// - Component contracts and the shared component base
// - Layout of the static (history) and dynamic (live) zones
// - The render loop and the output surface it writes to
// - Keyboard input classification and focus routing
// - The application lifecycle that ties the loops together

pub mod app;
pub mod base;
pub mod components;
pub mod input;
pub mod keyboard;
pub mod layout;
pub mod renderer;
pub mod stats;
pub mod streaming;
pub mod surface;
pub mod traits;

pub use app::{AppError, AppEvent, AppOptions, AppState, Application, RunArgs};
pub use renderer::{ComposedFrame, Renderer};
