// Demo backend: a local stand-in for a real assistant
//
// Streams a canned reply word by word so the streaming view, spinner and
// cancellation paths can be exercised without any network access.
//
// Special prompts:
//   /fail  - the stream errors halfway through
//   /long  - a reply long enough to scroll the history
//
// Run with: cargo run --release

use crate::chat::{ChatBackend, ChatMessage, ResponseStream, Role};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const GREETING: &str = "Hi! I'm the demo assistant. I echo what you say so you can watch \
                        responses stream in. Try /long or /fail.";

/// Echoes the latest user message back, one word at a time
#[derive(Debug, Clone)]
pub struct EchoBackend {
    token_delay: Duration,
}

impl EchoBackend {
    pub fn new(token_delay: Duration) -> Self {
        Self { token_delay }
    }

    fn reply_for(prompt: &str) -> (String, Option<usize>) {
        match prompt.trim() {
            "" => (GREETING.to_string(), None),
            "/fail" => (
                "Starting a response that is about to fail partway through".to_string(),
                Some(5),
            ),
            "/long" => {
                let paragraph = "The renderer keeps committed history in the static zone and \
                                 redraws only the live region below it on every change.";
                let body = (1..=12)
                    .map(|i| format!("{i}. {paragraph}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                (body, None)
            }
            text => (format!("You said: {text}"), None),
        }
    }
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(35))
    }
}

impl ChatBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn stream_response(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> ResponseStream {
        let prompt = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let (reply, fail_at) = Self::reply_for(&prompt);

        // Keep separators attached so the joined chunks reproduce the reply
        let chunks: Vec<String> = reply
            .split_inclusive(char::is_whitespace)
            .map(str::to_string)
            .collect();
        let delay = self.token_delay;

        stream::unfold(
            (chunks.into_iter().enumerate(), cancel),
            move |(mut chunks, cancel)| async move {
                let (index, chunk) = chunks.next()?;
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
                let item = if fail_at == Some(index) {
                    Err(anyhow::anyhow!("demo backend failed after {index} words"))
                } else {
                    Ok(chunk)
                };
                Some((item, (chunks, cancel)))
            },
        )
        // Stop after the first error
        .scan(false, |failed, item| {
            let done = *failed;
            *failed = item.is_err();
            futures::future::ready((!done).then_some(item))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(backend: &EchoBackend, prompt: &str) -> Vec<anyhow::Result<String>> {
        backend
            .stream_response(vec![ChatMessage::user(prompt)], CancellationToken::new())
            .collect()
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_streams_words() {
        let backend = EchoBackend::default();
        let chunks = collect(&backend, "hello there").await;
        let text: String = chunks.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(text, "You said: hello there");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_prompt_errors_midway() {
        let backend = EchoBackend::default();
        let chunks = collect(&backend, "/fail").await;
        assert_eq!(chunks.len(), 6);
        assert!(chunks[..5].iter().all(|c| c.is_ok()));
        assert!(chunks[5].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_stream() {
        let backend = EchoBackend::new(Duration::from_millis(100));
        let cancel = CancellationToken::new();
        let mut stream =
            backend.stream_response(vec![ChatMessage::user("one two three")], cancel.clone());

        assert_eq!(stream.next().await.unwrap().unwrap(), "You ");
        cancel.cancel();
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_greeting_without_user_message() {
        let (reply, fail_at) = EchoBackend::reply_for("");
        assert!(reply.starts_with("Hi!"));
        assert!(fail_at.is_none());
    }
}
