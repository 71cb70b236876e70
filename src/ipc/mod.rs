mod error;
mod handlers;
mod router;
mod types;

pub use router::{handle_line, on_export_finished, poll_redraw};
pub use types::{AppState, Event};
