mod actions;
mod event_handler;
mod state;

pub use actions::{append_log, refresh_window};
pub use event_handler::handle_ui_event;
pub use state::{AppState, LogEntry, Session, UiEvent};
