//! Commands Layer
//!
//! Handlers that bridge a front end (the CLI today) to the sync engine.
//! Errors are flattened to strings for display.

mod item_cmd;
mod view_cmd;

pub use item_cmd::*;
pub use view_cmd::*;
