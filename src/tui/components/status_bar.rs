// Status bar component
//
// Dynamic zone, bottom line: streaming state, working directory, message
// count, render statistics and the most recent warning. Adapts its format
// to the terminal width breakpoint.

use super::formatters::{format_compact_number, format_number, format_uptime};
use super::streaming_view::StreamingView;
use crate::chat::{display_path, HistoryStore, Workspace};
use crate::logging::{LogBuffer, LogLevel};
use crate::reactive::StateCoordinator;
use crate::tui::base::ComponentBase;
use crate::tui::layout::Breakpoint;
use crate::tui::renderer::Renderer;
use crate::tui::streaming::StreamingState;
use crate::tui::traits::{Component, ComponentId, RenderContext};
use crate::util::truncate_to_width;
use anyhow::Result;
use parking_lot::RwLock;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use std::sync::{Arc, Weak};
use tokio::time::Instant;

pub struct StatusBar {
    base: ComponentBase,
    streaming: Arc<StreamingView>,
    history: Arc<dyn HistoryStore>,
    workspace: Arc<dyn Workspace>,
    logs: Option<LogBuffer>,
    hint: RwLock<Option<&'static str>>,
    renderer: RwLock<Weak<Renderer>>,
    started_at: Instant,
}

impl StatusBar {
    /// `logs`, when given, surfaces the latest warning or error
    pub fn new(
        coordinator: Arc<StateCoordinator>,
        streaming: Arc<StreamingView>,
        history: Arc<dyn HistoryStore>,
        workspace: Arc<dyn Workspace>,
        logs: Option<LogBuffer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            base: ComponentBase::new("status", coordinator),
            streaming,
            history,
            workspace,
            logs,
            hint: RwLock::new(None),
            renderer: RwLock::new(Weak::new()),
            started_at: Instant::now(),
        })
    }

    /// Frame statistics come from this renderer
    pub fn attach_renderer(&self, renderer: &Arc<Renderer>) {
        *self.renderer.write() = Arc::downgrade(renderer);
    }

    /// Key hint shown at the right edge
    pub fn set_hint(&self, hint: Option<&'static str>) {
        *self.hint.write() = hint;
        self.base.request_render();
    }

    fn state_span(&self, ctx: &RenderContext) -> Span<'static> {
        let state = self.streaming.state();
        let (text, color) = match state {
            StreamingState::Generating => (
                format!("{} {}", ctx.spinner_char(), state.label()),
                Color::Cyan,
            ),
            StreamingState::Idle => (format!("● {}", state.label()), Color::Green),
            StreamingState::Cancelled => (format!("○ {}", state.label()), Color::Yellow),
            StreamingState::Failed => (format!("✗ {}", state.label()), Color::Red),
        };
        Span::styled(text, Style::default().fg(color))
    }

    fn frame_info(&self, bp: Breakpoint) -> Option<String> {
        let renderer = self.renderer.read().upgrade()?;
        let stats = renderer.statistics();
        Some(if bp.at_least(Breakpoint::Wide) {
            format!(
                "{} frames · {:.0} fps · {:.1}ms",
                format_compact_number(stats.total_frames),
                stats.current_fps,
                stats.last_render_ms
            )
        } else {
            format!("{:.0} fps", stats.current_fps)
        })
    }
}

impl Component for StatusBar {
    fn id(&self) -> ComponentId {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn render(&self, ctx: &RenderContext) -> Result<Text<'static>> {
        let bp = Breakpoint::from_width(ctx.width());
        let sep = || Span::styled(" │ ", Style::default().fg(Color::DarkGray));
        let dim = Style::default().fg(Color::DarkGray);

        let mut spans = vec![Span::raw(" "), self.state_span(ctx)];

        let dir = display_path(&self.workspace.current_dir());
        let dir_width = match bp {
            Breakpoint::Compact => 20,
            Breakpoint::Normal => 32,
            Breakpoint::Wide => 48,
        };
        spans.push(sep());
        spans.push(Span::raw(truncate_to_width(&dir, dir_width)));

        spans.push(sep());
        spans.push(Span::raw(format!("💬 {}", format_number(self.history.len() as u64))));

        if bp.at_least(Breakpoint::Normal) {
            if let Some(info) = self.frame_info(bp) {
                spans.push(sep());
                spans.push(Span::styled(info, dim));
            }
        }

        if bp.at_least(Breakpoint::Wide) {
            spans.push(sep());
            spans.push(Span::styled(format_uptime(self.started_at.elapsed()), dim));
        }

        if let Some(problem) = self.logs.as_ref().and_then(|l| l.latest_problem()) {
            let color = if problem.level == LogLevel::Error {
                Color::Red
            } else {
                Color::Yellow
            };
            spans.push(sep());
            spans.push(Span::styled(
                truncate_to_width(&problem.message, 40),
                Style::default().fg(color),
            ));
        } else if let Some(hint) = *self.hint.read() {
            if bp.at_least(Breakpoint::Normal) {
                spans.push(sep());
                spans.push(Span::styled(hint, dim));
            }
        }

        Ok(Text::from(Line::from(spans)))
    }

    fn dispose(&self) {
        self.base.dispose();
    }
}
