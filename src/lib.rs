//! chatterm - reactive terminal chat assistant
//!
//! The library holds the whole runtime so the binary, headless runs and the
//! integration tests assemble the same pieces:
//!
//! - [`reactive`]: state cells, effects and the debounced change coordinator
//! - [`tui`]: components, layout, the dual-zone renderer, keyboard pipeline
//!   and the application orchestrator
//! - [`chat`]: history, backend contract, session and the assembled screen
//! - [`config`], [`logging`], [`cli`], [`startup`]: the ambient stack
//! - [`demo`]: a local echo backend

pub mod chat;
pub mod cli;
pub mod config;
pub mod demo;
pub mod logging;
pub mod reactive;
pub mod startup;
pub mod tui;
pub mod util;
