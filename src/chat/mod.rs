//! Chat domain: history, backend contract, workspace and the session that
//! ties them to the input line.

pub mod backend;
pub mod history;
pub mod screen;
pub mod session;
pub mod workspace;

pub use backend::{ChatBackend, ResponseStream};
pub use history::{ChatMessage, HistoryStore, InMemoryHistory, Role};
pub use screen::{ChatScreen, ScreenParts};
pub use session::ChatSession;
pub use workspace::{display_path, FixedWorkspace, ProcessWorkspace, Workspace};
