//! Chat session controller
//!
//! Connects the input line to a [`ChatBackend`]: every submission becomes a
//! user message, a streamed response and finally an assistant message in the
//! history. One response is in flight at a time; the input line stays
//! editable but refuses to submit until the response ends.
//!
//! ```text
//! InputLine::submit ──▶ history += user ──▶ backend.stream_response
//!                                                │ increments
//!                                                ▼
//!                                         StreamingView::push
//!                                                │ completed / cancelled / failed
//!                                                ▼
//!                                  history += assistant (+ system note)
//! ```
//!
//! Esc or Ctrl+C cancel the response in flight; Ctrl+C with nothing in
//! flight shuts the application down. However the application stops, the
//! session is closed during its shutdown: the response in flight is
//! cancelled and its placeholder written before components are disposed.

use crate::chat::backend::{ChatBackend, ResponseStream};
use crate::chat::history::{ChatMessage, HistoryStore};
use crate::tui::app::Application;
use crate::tui::components::{InputLine, StreamingView};
use crate::tui::keyboard::KeyInput;
use crossterm::event::{KeyCode, KeyModifiers};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How a response ended
#[derive(Debug)]
enum Outcome {
    Completed,
    Cancelled,
    Failed(anyhow::Error),
}

pub struct ChatSession {
    input: Arc<InputLine>,
    streaming: Arc<StreamingView>,
    history: Arc<dyn HistoryStore>,
    backend: Arc<dyn ChatBackend>,
    /// Session lifetime; every response token is a child of it. Cancelled
    /// when the caller's token fires or the application shuts down.
    cancel: CancellationToken,
    current: Mutex<Option<CancellationToken>>,
    processing: watch::Sender<bool>,
}

impl ChatSession {
    /// Subscribe to `input` submissions and take over Esc and Ctrl+C
    pub fn attach(
        app: &Arc<Application>,
        input: Arc<InputLine>,
        streaming: Arc<StreamingView>,
        history: Arc<dyn HistoryStore>,
        backend: Arc<dyn ChatBackend>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (processing, _) = watch::channel(false);
        let session = Arc::new(Self {
            input,
            streaming,
            history,
            backend,
            cancel: cancel.child_token(),
            current: Mutex::new(None),
            processing,
        });

        let weak = Arc::downgrade(&session);
        session.input.on_submit(move |text| {
            if let Some(session) = weak.upgrade() {
                session.submit(text);
            }
        });

        let weak = Arc::downgrade(&session);
        app.keyboard().on_key_pressed(move |key: &mut KeyInput| {
            if key.code != KeyCode::Esc {
                return;
            }
            if weak.upgrade().is_some_and(|s| s.cancel_in_flight()) {
                key.mark_handled();
            }
        });

        let weak = Arc::downgrade(&session);
        let weak_app: Weak<Application> = Arc::downgrade(app);
        app.keyboard()
            .register_binding(KeyCode::Char('c'), KeyModifiers::CONTROL, move || {
                if weak.upgrade().is_some_and(|s| s.cancel_in_flight()) {
                    return;
                }
                if let Some(app) = weak_app.upgrade() {
                    app.request_shutdown();
                }
            });

        let weak = Arc::downgrade(&session);
        app.on_shutdown(move || {
            let session = weak.upgrade();
            async move {
                if let Some(session) = session {
                    session.close().await;
                }
            }
        });

        tracing::debug!("Chat session attached to backend '{}'", session.backend.name());
        session
    }

    pub fn is_processing(&self) -> bool {
        *self.processing.borrow()
    }

    /// Start a response for `text`. Returns false if it was not accepted.
    pub fn submit(self: &Arc<Self>, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let token = {
            let mut current = self.current.lock();
            if self.cancel.is_cancelled() {
                tracing::debug!("Submission ignored, the session is closed");
                return false;
            }
            if current.is_some() {
                tracing::debug!("Submission ignored, a response is already in flight");
                return false;
            }
            let token = self.cancel.child_token();
            *current = Some(token.clone());
            self.processing.send_replace(true);
            token
        };

        self.history.append(ChatMessage::user(text));
        self.input.set_locked(true);
        self.streaming.begin();

        tracing::info!("Requesting response from {}", self.backend.name());
        let stream = self
            .backend
            .stream_response(self.history.messages(), token.clone());
        tokio::spawn(Arc::clone(self).run_stream(stream, token));
        true
    }

    /// Cancel the response in flight. Returns false if there was none.
    pub fn cancel_in_flight(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) if !token.is_cancelled() => {
                tracing::info!("Cancelling response");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel the response in flight, refuse further submissions and wait
    /// for the cancelled response to be recorded
    pub async fn close(&self) {
        {
            // Under the submit lock: a response is either refused or visible to wait_idle
            let _current = self.current.lock();
            if !self.cancel.is_cancelled() {
                tracing::debug!("Closing chat session");
                self.cancel.cancel();
            }
        }
        self.wait_idle().await;
    }

    /// Resolves once no response is in flight
    pub async fn wait_idle(&self) {
        let mut rx = self.processing.subscribe();
        let _ = rx.wait_for(|processing| !*processing).await;
    }

    async fn run_stream(self: Arc<Self>, mut stream: ResponseStream, token: CancellationToken) {
        let mut received = String::new();
        let outcome = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break Outcome::Cancelled,
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        self.streaming.push(&chunk);
                        received.push_str(&chunk);
                    }
                    Some(Err(e)) => break Outcome::Failed(e),
                    None => break Outcome::Completed,
                },
            }
        };
        self.finish(outcome, received);
    }

    fn finish(&self, outcome: Outcome, received: String) {
        let partial = !received.is_empty();
        match outcome {
            Outcome::Completed => {
                tracing::debug!("Response completed ({} chars)", received.len());
                if partial {
                    self.history.append(ChatMessage::assistant(received));
                }
                self.streaming.finish_completed();
            }
            Outcome::Cancelled => {
                if partial {
                    self.history.append(ChatMessage::assistant(received));
                }
                self.history
                    .append(ChatMessage::system("[response cancelled]"));
                self.streaming.finish_cancelled();
            }
            Outcome::Failed(e) => {
                tracing::warn!("Response failed: {:#}", e);
                if partial {
                    self.history.append(ChatMessage::assistant(received));
                }
                self.history
                    .append(ChatMessage::system(format!("[response failed: {e}]")));
                self.streaming.finish_failed();
            }
        }

        *self.current.lock() = None;
        self.input.set_locked(false);
        self.processing.send_replace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::history::{InMemoryHistory, Role};
    use crate::tui::app::AppOptions;
    use crate::tui::keyboard::ScriptedInput;
    use crate::tui::streaming::StreamingState;
    use crate::tui::surface::MemorySurface;
    use crate::tui::traits::FocusTarget;
    use futures::stream;

    /// Replies with fixed chunks; `pending` keeps the stream open forever
    struct ScriptedBackend {
        chunks: Vec<anyhow::Result<String>>,
        pending: bool,
    }

    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn stream_response(&self, _history: Vec<ChatMessage>, _cancel: CancellationToken) -> ResponseStream {
            let chunks: Vec<anyhow::Result<String>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(s) => Ok(s.clone()),
                    Err(e) => Err(anyhow::anyhow!("{e}")),
                })
                .collect();
            let head = stream::iter(chunks);
            if self.pending {
                head.chain(stream::pending()).boxed()
            } else {
                head.boxed()
            }
        }
    }

    fn session(backend: ScriptedBackend) -> (Arc<ChatSession>, Arc<InMemoryHistory>, Arc<InputLine>, Arc<StreamingView>) {
        let app = Application::new(
            AppOptions::default(),
            Box::new(MemorySurface::new(80, 24)),
            Box::new(ScriptedInput::new()),
        );
        let input = InputLine::new(Arc::clone(app.coordinator()));
        let streaming = StreamingView::new(Arc::clone(app.coordinator()));
        let history = Arc::new(InMemoryHistory::new());
        let session = ChatSession::attach(
            &app,
            Arc::clone(&input),
            Arc::clone(&streaming),
            history.clone(),
            Arc::new(backend),
            CancellationToken::new(),
        );
        (session, history, input, streaming)
    }

    fn roles(history: &InMemoryHistory) -> Vec<(Role, String)> {
        history
            .messages()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect()
    }

    #[tokio::test]
    async fn test_completed_response_lands_in_history() {
        let (session, history, input, streaming) = session(ScriptedBackend {
            chunks: vec![Ok("Hel".into()), Ok("lo".into())],
            pending: false,
        });

        for ch in "hi".chars() {
            input.insert_char(ch);
        }
        assert_eq!(input.submit().as_deref(), Some("hi"));
        assert!(session.is_processing());
        assert!(input.is_locked());

        session.wait_idle().await;
        assert_eq!(
            roles(&history),
            vec![(Role::User, "hi".into()), (Role::Assistant, "Hello".into())]
        );
        assert_eq!(streaming.state(), StreamingState::Idle);
        assert!(!input.is_locked());
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_text() {
        let (session, history, _input, streaming) = session(ScriptedBackend {
            chunks: vec![Ok("partial".into())],
            pending: true,
        });

        assert!(session.submit("question"));
        assert!(!session.submit("again"), "one response at a time");

        // Let the first chunk arrive
        while streaming.text().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(session.cancel_in_flight());
        session.wait_idle().await;

        assert_eq!(streaming.state(), StreamingState::Cancelled);
        assert_eq!(
            roles(&history),
            vec![
                (Role::User, "question".into()),
                (Role::Assistant, "partial".into()),
                (Role::System, "[response cancelled]".into()),
            ]
        );
        assert!(!session.cancel_in_flight());
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let (session, history, _input, streaming) = session(ScriptedBackend {
            chunks: vec![Err(anyhow::anyhow!("backend unavailable"))],
            pending: false,
        });

        assert!(session.submit("hello"));
        session.wait_idle().await;

        assert_eq!(streaming.state(), StreamingState::Failed);
        let messages = roles(&history);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].0, Role::System);
        assert!(messages[1].1.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_blank_submission_is_ignored() {
        let (session, history, _, _) = session(ScriptedBackend {
            chunks: vec![],
            pending: false,
        });
        assert!(!session.submit("   "));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_close_cancels_and_refuses_new_work() {
        let (session, history, input, streaming) = session(ScriptedBackend {
            chunks: vec![],
            pending: true,
        });

        assert!(session.submit("long question"));
        session.close().await;

        assert!(!session.is_processing());
        assert_eq!(streaming.state(), StreamingState::Cancelled);
        assert_eq!(
            roles(&history),
            vec![
                (Role::User, "long question".into()),
                (Role::System, "[response cancelled]".into()),
            ]
        );
        assert!(!input.is_locked());

        assert!(!session.submit("after close"));
        assert_eq!(history.len(), 2);
        session.close().await;
    }
}
