//! Navigation and transaction layer for editing zip-like archives
//!
//! A [`Workspace`] wraps an [`ArchiveStore`] with the state of a folder view:
//! the selected folder, back/forward history, highlighted entries and a
//! cut/copy clipboard. Imports and exports run through the same workspace and
//! talk to the user through the [`Ui`] prompt channel and the [`Downloads`]
//! list.

pub mod archive;
pub mod config;
pub mod downloads;
pub mod error;
mod export;
pub mod handle;
mod import;
pub mod navigation;
pub mod store;
pub mod ui;
pub mod workspace;

pub use downloads::{DownloadSink, Downloads};
pub use error::{Error, ErrorKind, Result};
pub use store::{ArchiveStore, EntryId, EntryInfo, MemoryStore};
pub use ui::Ui;
pub use workspace::Workspace;
