// Streaming view component
//
// Dynamic zone, top: the assistant response while it streams in. Empty when
// nothing is in flight; the finished text moves to the history.

use crate::reactive::{StateCell, StateCoordinator};
use crate::tui::base::ComponentBase;
use crate::tui::streaming::{StreamingState, StreamingStateMachine};
use crate::tui::traits::{Component, ComponentId, RenderContext};
use anyhow::Result;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use std::sync::Arc;

pub struct StreamingView {
    base: ComponentBase,
    text: StateCell<String>,
    machine: StateCell<StreamingStateMachine>,
}

impl StreamingView {
    pub fn new(coordinator: Arc<StateCoordinator>) -> Arc<Self> {
        let base = ComponentBase::new("streaming", coordinator);
        let text = base.use_state("text", String::new());
        let machine = base.use_state("machine", StreamingStateMachine::new());
        Arc::new(Self {
            base,
            text,
            machine,
        })
    }

    pub fn state(&self) -> StreamingState {
        self.machine.with(|m| m.state())
    }

    /// Text received so far for the current response
    pub fn text(&self) -> String {
        self.text.get()
    }

    pub fn begin(&self) {
        self.text.set(String::new());
        self.machine.update(|m| m.on_request());
    }

    pub fn push(&self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.text.update(|t| t.push_str(chunk));
        self.machine.update(|m| m.on_increment());
    }

    pub fn finish_completed(&self) {
        self.finish(StreamingStateMachine::on_complete);
    }

    pub fn finish_cancelled(&self) {
        self.finish(StreamingStateMachine::on_cancel);
    }

    pub fn finish_failed(&self) {
        self.finish(StreamingStateMachine::on_failure);
    }

    fn finish(&self, transition: fn(&mut StreamingStateMachine)) {
        self.machine.update(transition);
        self.text.set(String::new());
    }
}

impl Component for StreamingView {
    fn id(&self) -> ComponentId {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn render(&self, ctx: &RenderContext) -> Result<Text<'static>> {
        if !self.state().is_processing() {
            return Ok(Text::default());
        }

        let header = Line::from(vec![
            Span::styled(
                format!("{} ", ctx.spinner_char()),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                "assistant",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);

        let mut lines = vec![header];
        self.text.with(|text| {
            lines.extend(text.lines().map(|l| Line::from(l.to_string())));
        });
        Ok(Text::from(lines))
    }

    /// The spinner animates on every tick while a response streams
    fn should_update(&self) -> bool {
        self.state().is_processing()
    }

    fn dispose(&self) {
        self.base.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::traits::Zone;
    use ratatui::layout::Rect;
    use std::time::Duration;

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_streaming_lifecycle() {
        let coordinator = StateCoordinator::new(Duration::from_millis(5));
        let view = StreamingView::new(Arc::clone(&coordinator));
        let ctx = RenderContext::new(Zone::Dynamic, Rect::new(0, 0, 80, 6), 0, None);

        assert!(view.render(&ctx).unwrap().lines.is_empty());
        assert!(!view.should_update());

        view.begin();
        view.push("Hello");
        view.push(", world");
        assert!(coordinator.has_pending_for(view.id()));
        assert!(view.should_update());

        let rendered = plain(&view.render(&ctx).unwrap());
        assert_eq!(rendered, vec!["⠋ assistant".to_string(), "Hello, world".to_string()]);

        view.finish_cancelled();
        assert_eq!(view.state(), StreamingState::Cancelled);
        assert_eq!(view.text(), "");
        assert!(view.render(&ctx).unwrap().lines.is_empty());
    }
}
