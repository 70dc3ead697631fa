//! Navigation state of the archive browser
//!
//! Split into modules to reduce complexity.

mod clipboard;
mod history;
mod selection;

pub use clipboard::{Clipboard, Paste};
pub use history::History;
pub use selection::Selection;
