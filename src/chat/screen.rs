//! The assembled chat screen
//!
//! Builds the application, the four components and the session in their
//! zones, the same way for the terminal, headless runs and tests.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ HistoryView        (static)  │
//! ├──────────────────────────────┤
//! │ StreamingView      (dynamic) │
//! │ InputLine          (dynamic) │
//! │ StatusBar          (dynamic) │
//! └──────────────────────────────┘
//! ```

use crate::chat::{ChatBackend, ChatSession, HistoryStore, InMemoryHistory, Workspace};
use crate::config::Config;
use crate::logging::LogBuffer;
use crate::tui::app::{AppOptions, Application};
use crate::tui::components::{HistoryView, InputLine, StatusBar, StreamingView};
use crate::tui::keyboard::InputSource;
use crate::tui::surface::RenderSurface;
use crate::tui::traits::{FocusTarget, Zone};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything `build` needs besides the config
pub struct ScreenParts {
    pub surface: Box<dyn RenderSurface>,
    pub input: Box<dyn InputSource>,
    pub backend: Arc<dyn ChatBackend>,
    pub workspace: Arc<dyn Workspace>,
    /// Surfaces the latest warning in the status bar
    pub logs: Option<LogBuffer>,
}

pub struct ChatScreen {
    pub app: Arc<Application>,
    pub history: Arc<InMemoryHistory>,
    pub input: Arc<InputLine>,
    pub streaming: Arc<StreamingView>,
    pub status: Arc<StatusBar>,
    pub session: Arc<ChatSession>,
}

impl ChatScreen {
    /// Must be called inside a Tokio runtime
    pub fn build(config: &Config, parts: ScreenParts, cancel: CancellationToken) -> Self {
        let app = Application::new(
            AppOptions {
                render: config.render.clone(),
                keyboard: config.keyboard.clone(),
                layout: config.layout.clone(),
            },
            parts.surface,
            parts.input,
        );
        let coordinator = app.coordinator();

        let history = Arc::new(InMemoryHistory::new());
        let history_view = HistoryView::new(Arc::clone(coordinator), history.clone());
        let streaming = StreamingView::new(Arc::clone(coordinator));
        let input = InputLine::new(Arc::clone(coordinator));
        let status = StatusBar::new(
            Arc::clone(coordinator),
            Arc::clone(&streaming),
            history.clone(),
            parts.workspace,
            parts.logs,
        );
        status.attach_renderer(app.renderer());
        status.set_hint(input.focus_hint());

        app.register_component(history_view, Zone::Static);
        app.register_component(streaming.clone(), Zone::Dynamic);
        app.register_component(input.clone(), Zone::Dynamic);
        app.register_component(status.clone(), Zone::Dynamic);
        app.set_focus(input.clone());

        let session = ChatSession::attach(
            &app,
            Arc::clone(&input),
            Arc::clone(&streaming),
            history.clone(),
            parts.backend,
            cancel,
        );

        Self {
            app,
            history,
            input,
            streaming,
            status,
            session,
        }
    }

    /// The conversation as plain text, one `role: content` block per message
    pub fn transcript(&self) -> String {
        self.history
            .messages()
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
