//! Archive store contract
//!
//! The store owns the entry tree and the archive codec. Everything above it
//! (history, highlight, clipboard, import and export pipelines) only talks to
//! the tree through this trait.

mod codec;
mod crypto;
mod memory;

use std::fmt;
use std::time::SystemTime;

use crate::downloads::DownloadHandle;
use crate::error::Result;

pub use memory::MemoryStore;

/// Stable identity of an entry, never reused after removal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata carried by file entries only
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryMeta {
    pub last_modified: Option<SystemTime>,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Snapshot of one node of the tree
#[derive(Clone, Debug, PartialEq)]
pub struct EntryInfo {
    pub id: EntryId,
    pub name: String,
    pub directory: bool,
    pub parent: Option<EntryId>,
    pub meta: Option<EntryMeta>,
}

/// Write options forwarded to the codec when exporting
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    pub password: Option<String>,
    pub buffered_write: bool,
    pub keep_order: bool,
}

#[allow(async_fn_in_trait)]
pub trait ArchiveStore {
    fn root(&self) -> EntryId;

    fn lookup(&self, id: EntryId) -> Result<EntryInfo>;

    /// Children of a folder in display order
    fn children(&self, folder: EntryId) -> Result<Vec<EntryId>>;

    /// True when `ancestor` is a strict ancestor of `id`
    fn is_descendant_of(&self, id: EntryId, ancestor: EntryId) -> bool;

    /// Fails on a name collision in `dest` or when `dest` is `id` or one of its
    /// descendants. Moving an entry into its current parent succeeds unchanged.
    fn move_entry(&mut self, id: EntryId, dest: EntryId) -> Result<()>;

    /// Detached copy, not reachable from the root until moved
    fn clone_entry(&mut self, id: EntryId, deep: bool) -> Result<EntryId>;

    /// Removes the entry and its subtree (works on detached entries too)
    fn remove(&mut self, id: EntryId) -> Result<()>;

    fn rename(&mut self, id: EntryId, name: &str) -> Result<()>;

    fn create_directory(&mut self, folder: EntryId, name: &str) -> Result<EntryId>;

    fn create_file(
        &mut self,
        folder: EntryId,
        name: &str,
        bytes: Vec<u8>,
        modified: Option<SystemTime>,
    ) -> Result<EntryId>;

    /// Materializes the archive's entries under `folder` and returns every
    /// entry it created, parents before children.
    async fn import_archive(
        &mut self,
        folder: EntryId,
        blob: &[u8],
        password: Option<&str>,
    ) -> Result<Vec<EntryId>>;

    /// Serializes the subtree of `folder`. No bytes are returned when the
    /// download is aborted part way.
    async fn export_folder(
        &self,
        folder: EntryId,
        options: &ExportOptions,
        download: &DownloadHandle,
    ) -> Result<Vec<u8>>;

    async fn read_file(&self, id: EntryId, download: &DownloadHandle) -> Result<Vec<u8>>;

    async fn is_password_protected(&self, id: EntryId) -> Result<bool>;

    async fn check_password(&self, id: EntryId, candidate: &str) -> Result<bool>;
}

/// Remove detached entries nothing refers to anymore
pub(crate) fn release<S: ArchiveStore>(store: &mut S, ids: &[EntryId]) {
    for &id in ids {
        if let Err(e) = store.remove(id) {
            tracing::debug!(%id, error = %e, "released entry already gone");
        }
    }
}

/// Name used to annotate errors; unnamed or missing entries fall back to the id
pub(crate) fn display_name<S: ArchiveStore>(store: &S, id: EntryId) -> String {
    store
        .lookup(id)
        .ok()
        .map(|info| info.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.to_string())
}
