//! Assistant backend contract
//!
//! A backend takes the running history and yields a stream of text
//! increments. The stream is lazy: nothing happens until it is polled, and
//! every call starts a fresh response. Backends must stop promptly when the
//! cancellation token fires.

use crate::chat::history::ChatMessage;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// Stream of text increments for one response
pub type ResponseStream = BoxStream<'static, anyhow::Result<String>>;

pub trait ChatBackend: Send + Sync {
    /// Short name for logs and the status bar
    fn name(&self) -> &str;

    fn stream_response(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> ResponseStream;
}
