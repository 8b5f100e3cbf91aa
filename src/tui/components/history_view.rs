// History view component
//
// Static zone: the conversation so far. Reads from a `HistoryStore` and
// only re-renders when the store's revision moves.

use crate::chat::{ChatMessage, HistoryStore, Role};
use crate::reactive::{StateCell, StateCoordinator};
use crate::tui::base::ComponentBase;
use crate::tui::traits::{Component, ComponentId, RenderContext};
use anyhow::Result;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Messages older than this are not rendered
const MAX_RENDERED_MESSAGES: usize = 200;

pub struct HistoryView {
    base: ComponentBase,
    history: Arc<dyn HistoryStore>,
    revision: StateCell<u64>,
    rendered_revision: AtomicU64,
}

impl HistoryView {
    pub fn new(coordinator: Arc<StateCoordinator>, history: Arc<dyn HistoryStore>) -> Arc<Self> {
        let base = ComponentBase::new("history", coordinator);
        let revision = base.use_state("revision", history.revision());

        let cell = revision.clone();
        history.on_append(Box::new(move |rev| {
            cell.set(rev);
        }));

        Arc::new(Self {
            base,
            history,
            revision,
            // Force the first pass to render
            rendered_revision: AtomicU64::new(u64::MAX),
        })
    }

    fn role_style(role: Role) -> Style {
        let color = match role {
            Role::User => Color::Green,
            Role::Assistant => Color::Cyan,
            Role::System => Color::Yellow,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn message_lines(message: &ChatMessage, lines: &mut Vec<Line<'static>>) {
        lines.push(Line::from(vec![
            Span::styled(message.role.label().to_string(), Self::role_style(message.role)),
            Span::styled(
                format!("  {}", message.timestamp.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        let body_style = match message.role {
            Role::System => Style::default().fg(Color::DarkGray),
            _ => Style::default(),
        };
        for line in message.content.lines() {
            lines.push(Line::styled(line.to_string(), body_style));
        }
    }
}

impl Component for HistoryView {
    fn id(&self) -> ComponentId {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn render(&self, _ctx: &RenderContext) -> Result<Text<'static>> {
        let revision = self.revision.get();
        let messages = self.history.messages();
        let skip = messages.len().saturating_sub(MAX_RENDERED_MESSAGES);

        let mut lines = Vec::new();
        for (i, message) in messages.iter().skip(skip).enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            Self::message_lines(message, &mut lines);
        }

        self.rendered_revision.store(revision, Ordering::Release);
        Ok(Text::from(lines))
    }

    fn should_update(&self) -> bool {
        self.revision.get() != self.rendered_revision.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        self.base.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::InMemoryHistory;
    use crate::tui::traits::Zone;
    use ratatui::layout::Rect;
    use std::time::Duration;

    fn ctx() -> RenderContext {
        RenderContext::new(Zone::Static, Rect::new(0, 0, 80, 20), 0, None)
    }

    #[tokio::test]
    async fn test_renders_messages_in_order() {
        let coordinator = StateCoordinator::new(Duration::from_millis(5));
        let history = Arc::new(InMemoryHistory::new());
        history.append(ChatMessage::user("hi there"));
        history.append(ChatMessage::assistant("hello\nsecond line"));

        let view = HistoryView::new(coordinator, history);
        let text = view.render(&ctx()).unwrap();
        let heads: Vec<String> = text
            .lines
            .iter()
            .map(|l| l.spans.first().map(|s| s.content.to_string()).unwrap_or_default())
            .collect();
        assert_eq!(heads[0], "you");
        assert_eq!(heads[1], "hi there");
        assert_eq!(heads[2], "");
        assert_eq!(heads[3], "assistant");
        assert_eq!(heads[5], "second line");
    }

    #[tokio::test]
    async fn test_append_marks_dirty_until_rendered() {
        let coordinator = StateCoordinator::new(Duration::from_millis(5));
        let history = Arc::new(InMemoryHistory::new());
        let view = HistoryView::new(Arc::clone(&coordinator), history.clone());

        assert!(view.should_update());
        view.render(&ctx()).unwrap();
        assert!(!view.should_update());

        history.append(ChatMessage::user("again"));
        assert!(view.should_update());
        assert!(coordinator.has_pending_for(view.id()));

        view.render(&ctx()).unwrap();
        assert!(!view.should_update());
    }
}
