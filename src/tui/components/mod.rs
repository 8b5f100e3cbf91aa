// Components - the concrete chat screen
//
// Static zone:
// - History view: the committed conversation
//
// Dynamic zone, top to bottom:
// - Streaming view: the response currently arriving
// - Input line: the focused prompt
// - Status bar: state, directory, frame statistics

pub mod formatters;
pub mod history_view;
pub mod input_line;
pub mod status_bar;
pub mod streaming_view;

pub use formatters::{format_compact_number, format_number};
pub use history_view::HistoryView;
pub use input_line::InputLine;
pub use status_bar::StatusBar;
pub use streaming_view::StreamingView;
