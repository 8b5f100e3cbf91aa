// Input line component
//
// Dynamic zone: the prompt the user types into. Owns keyboard focus through
// `FocusTarget`. Submitting clears the buffer and notifies submit
// subscribers with the text; Up/Down recall earlier submissions.

use crate::reactive::{StateCell, StateCoordinator};
use crate::tui::base::ComponentBase;
use crate::tui::traits::{Component, ComponentId, FocusTarget, Handled, Navigation, RenderContext};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use parking_lot::Mutex;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use std::sync::Arc;

const PROMPT: &str = "› ";
const PLACEHOLDER: &str = "Type a message, Enter to send";

/// Maximum remembered submissions for Up/Down recall
const MAX_RECALL: usize = 100;

type SubmitListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Edit buffer plus cursor, stored in one cell so a keystroke is one change
#[derive(Debug, Clone, Default, PartialEq)]
struct Draft {
    text: String,
    /// Cursor position in characters
    cursor: usize,
}

impl Draft {
    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn replace(&mut self, text: String) {
        self.cursor = text.chars().count();
        self.text = text;
    }
}

#[derive(Default)]
struct Recall {
    entries: Vec<String>,
    /// Index into `entries` while browsing, None when editing a fresh line
    position: Option<usize>,
}

pub struct InputLine {
    base: ComponentBase,
    draft: StateCell<Draft>,
    /// While locked, typing works but submit is refused
    locked: StateCell<bool>,
    recall: Mutex<Recall>,
    listeners: Mutex<Vec<SubmitListener>>,
}

impl InputLine {
    pub fn new(coordinator: Arc<StateCoordinator>) -> Arc<Self> {
        let base = ComponentBase::new("input", coordinator);
        let draft = base.use_state("draft", Draft::default());
        let locked = base.use_state("locked", false);
        Arc::new(Self {
            base,
            draft,
            locked,
            recall: Mutex::new(Recall::default()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Current buffered text
    pub fn text(&self) -> String {
        self.draft.with(|d| d.text.clone())
    }

    pub fn cursor(&self) -> usize {
        self.draft.with(|d| d.cursor)
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.set(locked);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    /// Called with the text of every successful submission
    pub fn on_submit(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    fn move_cursor(&self, f: impl FnOnce(&mut Draft)) -> Handled {
        Handled::from(self.draft.update(f))
    }

    fn recall(&self, older: bool) -> Handled {
        let next = {
            let mut recall = self.recall.lock();
            if recall.entries.is_empty() {
                return Handled::No;
            }
            let last = recall.entries.len() - 1;
            let position = match (recall.position, older) {
                (None, true) => Some(last),
                (None, false) => return Handled::No,
                (Some(0), true) => Some(0),
                (Some(p), true) => Some(p - 1),
                (Some(p), false) if p >= last => None,
                (Some(p), false) => Some(p + 1),
            };
            recall.position = position;
            position
                .map(|p| recall.entries[p].clone())
                .unwrap_or_default()
        };
        self.draft.update(|d| d.replace(next));
        Handled::Yes
    }
}

impl Component for InputLine {
    fn id(&self) -> ComponentId {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn render(&self, ctx: &RenderContext) -> Result<Text<'static>> {
        let focused = ctx.is_focused(self.id());
        let rule = Line::styled(
            "─".repeat(ctx.width() as usize),
            Style::default().fg(Color::DarkGray),
        );

        let prompt_style = if self.is_locked() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        };
        let mut spans = vec![Span::styled(PROMPT, prompt_style)];

        let draft = self.draft.get();
        if draft.text.is_empty() && !focused {
            spans.push(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)));
        } else if focused {
            let at = draft.byte_index(draft.cursor);
            let (before, rest) = draft.text.split_at(at);
            let mut rest_chars = rest.chars();
            let under = rest_chars.next().map(String::from).unwrap_or_else(|| " ".into());
            spans.push(Span::raw(before.to_string()));
            spans.push(Span::styled(
                under,
                Style::default().add_modifier(Modifier::REVERSED),
            ));
            spans.push(Span::raw(rest_chars.as_str().to_string()));
        } else {
            spans.push(Span::raw(draft.text));
        }

        Ok(Text::from(vec![rule, Line::from(spans)]))
    }

    /// Only pending changes (typing, focus moves) redraw the input line
    fn should_update(&self) -> bool {
        false
    }

    fn dispose(&self) {
        self.listeners.lock().clear();
        self.base.dispose();
    }

    fn focus_target(&self) -> Option<&dyn FocusTarget> {
        Some(self)
    }
}

impl FocusTarget for InputLine {
    fn insert_char(&self, ch: char) {
        self.draft.update(|d| {
            let at = d.byte_index(d.cursor);
            d.text.insert(at, ch);
            d.cursor += 1;
        });
    }

    fn delete_backward(&self) {
        self.draft.update(|d| {
            if d.cursor > 0 {
                let at = d.byte_index(d.cursor - 1);
                d.text.remove(at);
                d.cursor -= 1;
            }
        });
    }

    fn delete_forward(&self) {
        self.draft.update(|d| {
            if d.cursor < d.char_len() {
                let at = d.byte_index(d.cursor);
                d.text.remove(at);
            }
        });
    }

    fn navigate(&self, nav: Navigation) -> Handled {
        match nav {
            Navigation::Left => self.move_cursor(|d| d.cursor = d.cursor.saturating_sub(1)),
            Navigation::Right => self.move_cursor(|d| d.cursor = (d.cursor + 1).min(d.char_len())),
            Navigation::Home => self.move_cursor(|d| d.cursor = 0),
            Navigation::End => self.move_cursor(|d| d.cursor = d.char_len()),
            Navigation::Up => self.recall(true),
            Navigation::Down => self.recall(false),
            Navigation::PageUp | Navigation::PageDown => Handled::No,
        }
    }

    fn submit(&self) -> Option<String> {
        if self.is_locked() {
            tracing::debug!("Submit ignored while a response is in flight");
            return None;
        }
        let text = self.text();
        if text.trim().is_empty() {
            return None;
        }

        self.draft.set(Draft::default());
        {
            let mut recall = self.recall.lock();
            recall.position = None;
            if recall.entries.last() != Some(&text) {
                recall.entries.push(text.clone());
                if recall.entries.len() > MAX_RECALL {
                    recall.entries.remove(0);
                }
            }
        }

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(&text);
        }
        Some(text)
    }

    fn clear(&self) -> Handled {
        self.recall.lock().position = None;
        Handled::from(self.draft.set(Draft::default()))
    }

    fn handle_key(&self, code: KeyCode, modifiers: KeyModifiers) -> Handled {
        if !modifiers.contains(KeyModifiers::CONTROL) {
            return Handled::No;
        }
        match code {
            KeyCode::Char('u') => self.clear(),
            KeyCode::Char('a') => self.navigate(Navigation::Home),
            KeyCode::Char('e') => self.navigate(Navigation::End),
            _ => Handled::No,
        }
    }

    fn focus_hint(&self) -> Option<&'static str> {
        Some("Enter send · Esc cancel · ↑↓ recall · Ctrl+C quit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn input() -> Arc<InputLine> {
        InputLine::new(StateCoordinator::new(Duration::from_millis(5)))
    }

    #[tokio::test]
    async fn test_editing_at_cursor() {
        let input = input();
        for ch in "helo".chars() {
            input.insert_char(ch);
        }
        input.navigate(Navigation::Left);
        input.insert_char('l');
        assert_eq!(input.text(), "hello");
        assert_eq!(input.cursor(), 4);

        input.navigate(Navigation::Home);
        input.delete_forward();
        input.delete_backward();
        assert_eq!(input.text(), "ello");
        assert_eq!(input.cursor(), 0);

        input.navigate(Navigation::End);
        input.delete_backward();
        assert_eq!(input.text(), "ell");
    }

    #[tokio::test]
    async fn test_multibyte_editing() {
        let input = input();
        for ch in "héllo→".chars() {
            input.insert_char(ch);
        }
        input.delete_backward();
        input.navigate(Navigation::Left);
        input.navigate(Navigation::Left);
        input.navigate(Navigation::Left);
        input.delete_backward();
        assert_eq!(input.text(), "hllo");
    }

    #[tokio::test]
    async fn test_submit_clears_and_notifies_once() {
        let input = input();
        let submitted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&submitted);
        input.on_submit(move |text| sink.lock().push(text.to_string()));

        assert_eq!(input.submit(), None);
        for ch in "Hello".chars() {
            input.insert_char(ch);
        }
        assert_eq!(input.submit().as_deref(), Some("Hello"));
        assert_eq!(input.text(), "");
        assert_eq!(*submitted.lock(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_locked_input_keeps_draft() {
        let input = input();
        input.set_locked(true);
        input.insert_char('x');
        assert_eq!(input.submit(), None);
        assert_eq!(input.text(), "x");

        input.set_locked(false);
        assert_eq!(input.submit().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_history_recall() {
        let input = input();
        for line in ["first", "second"] {
            for ch in line.chars() {
                input.insert_char(ch);
            }
            input.submit();
        }

        assert_eq!(input.navigate(Navigation::Down), Handled::No);
        input.navigate(Navigation::Up);
        assert_eq!(input.text(), "second");
        input.navigate(Navigation::Up);
        input.navigate(Navigation::Up);
        assert_eq!(input.text(), "first");
        input.navigate(Navigation::Down);
        assert_eq!(input.text(), "second");
        input.navigate(Navigation::Down);
        assert_eq!(input.text(), "");
    }

    #[tokio::test]
    async fn test_clear_reports_whether_anything_changed() {
        let input = input();
        assert_eq!(input.clear(), Handled::No);
        input.insert_char('a');
        assert_eq!(
            input.handle_key(KeyCode::Char('u'), KeyModifiers::CONTROL),
            Handled::Yes
        );
        assert_eq!(input.text(), "");
    }

    #[tokio::test]
    async fn test_render_shows_cursor_when_focused() {
        let input = input();
        input.insert_char('h');
        input.insert_char('i');
        input.navigate(Navigation::Left);

        let ctx = RenderContext::new(
            crate::tui::traits::Zone::Dynamic,
            ratatui::layout::Rect::new(0, 0, 10, 2),
            0,
            Some(input.id()),
        );
        let text = input.render(&ctx).unwrap();
        assert_eq!(text.lines.len(), 2);
        let spans: Vec<&str> = text.lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(spans, vec![PROMPT, "h", "i", ""]);
        assert!(text.lines[1].spans[2]
            .style
            .add_modifier
            .contains(Modifier::REVERSED));
    }
}
