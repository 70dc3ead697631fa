//! Workspace: the archive tree plus everything the user is looking at
//!
//! Every operation takes the workspace by `&mut`, including across prompt
//! awaits, so tree edits, history and highlight never interleave.

mod edit;
mod navigate;

use crate::config::Options;
use crate::downloads::DownloadSink;
use crate::error::{Error, Result};
use crate::navigation::{Clipboard, History, Selection};
use crate::store::{ArchiveStore, EntryId, EntryInfo};
use crate::ui::Ui;

pub struct Workspace<S: ArchiveStore> {
    pub(crate) store: S,
    pub(crate) selected_folder: EntryId,
    pub(crate) listing: Vec<EntryInfo>,
    pub(crate) history: History,
    pub(crate) selection: Selection,
    pub(crate) clipboard: Clipboard,
    pub(crate) ui: Ui,
    pub(crate) downloads: DownloadSink,
    pub(crate) options: Options,
}

impl<S: ArchiveStore> Workspace<S> {
    pub fn new(store: S, ui: Ui, downloads: DownloadSink, options: Options) -> Self {
        let root = store.root();
        let mut workspace = Self {
            store,
            selected_folder: root,
            listing: Vec::new(),
            history: History::new(root),
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            ui,
            downloads,
            options,
        };
        workspace.refresh_or_report();
        workspace
    }

    /// Replace the tree, e.g. after opening another archive
    pub fn load(&mut self, store: S) {
        let root = store.root();
        self.store = store;
        self.selected_folder = root;
        self.history = History::new(root);
        self.selection.reset();
        self.clipboard = Clipboard::new();
        self.refresh_or_report();
        tracing::info!("workspace loaded");
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn root(&self) -> EntryId {
        self.store.root()
    }

    pub fn selected_folder(&self) -> EntryId {
        self.selected_folder
    }

    /// Children of the selected folder, folders first then by name
    pub fn listing(&self) -> &[EntryInfo] {
        &self.listing
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Highlighted entries in listing order
    pub fn highlighted(&self) -> Vec<&EntryInfo> {
        self.listing
            .iter()
            .filter(|e| self.selection.contains(e.id))
            .collect()
    }

    /// Forward a failed operation's error to the UI. Returns the value on success.
    pub fn report<T>(&self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.ui.display_error(&e);
                None
            }
        }
    }

    pub(crate) fn listing_ids(&self) -> Vec<EntryId> {
        self.listing.iter().map(|e| e.id).collect()
    }

    fn is_listed(&self, id: EntryId) -> bool {
        self.listing.iter().any(|e| e.id == id)
    }

    /// Highlighted ids in highlight order, restricted to the displayed folder
    pub(crate) fn highlighted_ids(&self) -> Vec<EntryId> {
        self.selection
            .ids()
            .iter()
            .copied()
            .filter(|&id| self.is_listed(id))
            .collect()
    }

    /// Re-read the selected folder and drop highlights that left it
    pub(crate) fn refresh(&mut self) -> Result<()> {
        let mut listing = self
            .store
            .children(self.selected_folder)?
            .into_iter()
            .map(|id| self.store.lookup(id))
            .collect::<Result<Vec<_>>>()?;
        sort_listing(&mut listing);
        self.listing = listing;
        let ids = self.listing_ids();
        self.selection.retain_listed(&ids);
        Ok(())
    }

    fn refresh_or_report(&mut self) {
        if let Err(e) = self.refresh() {
            self.listing.clear();
            self.selection.reset();
            self.ui.display_error(&e);
        }
    }

    // Highlight commands. Ids outside the displayed folder are ignored.

    pub fn highlight(&mut self, id: EntryId) {
        if self.is_listed(id) {
            self.selection.highlight(id);
        }
    }

    pub fn toggle(&mut self, id: EntryId) {
        if self.is_listed(id) {
            self.selection.toggle(id);
        }
    }

    pub fn toggle_range(&mut self, id: EntryId) {
        if !self.is_listed(id) {
            return;
        }
        let ids = self.listing_ids();
        self.selection.toggle_range(id, &ids);
    }

    pub fn highlight_all(&mut self) {
        let ids = self.listing_ids();
        self.selection.highlight_all(&ids);
    }

    pub fn clear_highlight(&mut self) {
        self.selection.clear();
    }

    pub fn highlight_previous(&mut self) {
        self.step(-1);
    }

    pub fn highlight_next(&mut self) {
        self.step(1);
    }

    pub fn highlight_previous_page(&mut self) {
        self.step(-(self.options.page_size.max(1) as isize));
    }

    pub fn highlight_next_page(&mut self) {
        self.step(self.options.page_size.max(1) as isize);
    }

    pub fn highlight_first(&mut self) {
        let ids = self.listing_ids();
        self.selection.first(&ids);
    }

    pub fn highlight_last(&mut self) {
        let ids = self.listing_ids();
        self.selection.last(&ids);
    }

    fn step(&mut self, delta: isize) {
        let ids = self.listing_ids();
        self.selection.step(&ids, delta);
    }

    /// Highlight newly added entries, sorted by descending name
    pub(crate) fn highlight_added(&mut self, ids: &[EntryId]) {
        let mut added: Vec<&EntryInfo> = self
            .listing
            .iter()
            .filter(|e| ids.contains(&e.id))
            .collect();
        added.sort_by(|a, b| b.name.cmp(&a.name));
        let added = added.into_iter().map(|e| e.id).collect();
        self.selection.set(added);
    }
}

impl<S: ArchiveStore + Default> Workspace<S> {
    /// Start over with an empty tree
    pub fn reset(&mut self) {
        self.load(S::default());
    }
}

fn sort_listing(listing: &mut [EntryInfo]) {
    listing.sort_by(|a, b| match (a.directory, b.directory) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// Collapse per-entry failures, logging how many there were
pub(crate) fn collect_errors(operation: &str, errors: Vec<Error>) -> Result<()> {
    if !errors.is_empty() {
        tracing::warn!(operation, failed = errors.len(), "some entries failed");
    }
    match Error::from_many(errors) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::downloads::Downloads;
    use crate::store::MemoryStore;
    use crate::ui::UiRequest;
    use tokio::sync::mpsc::UnboundedReceiver;

    pub(crate) struct Harness {
        pub workspace: Workspace<MemoryStore>,
        pub requests: UnboundedReceiver<UiRequest>,
        pub downloads: Downloads,
    }

    pub(crate) fn harness(store: MemoryStore) -> Harness {
        let (ui, requests) = Ui::channel();
        let downloads = Downloads::new();
        let workspace = Workspace::new(store, ui, downloads.sink(), Options::default());
        Harness {
            workspace,
            requests,
            downloads,
        }
    }

    pub(crate) fn names(workspace: &Workspace<MemoryStore>) -> Vec<String> {
        workspace.listing().iter().map(|e| e.name.clone()).collect()
    }

    pub(crate) fn highlighted_names(workspace: &Workspace<MemoryStore>) -> Vec<String> {
        workspace
            .selection()
            .ids()
            .iter()
            .map(|&id| workspace.store().lookup(id).unwrap().name)
            .collect()
    }

    #[test]
    fn test_listing_sorted_folders_first() {
        let mut store = MemoryStore::new();
        let root = store.root();
        store.create_file(root, "b.txt", Vec::new(), None).unwrap();
        store.create_directory(root, "Zeta").unwrap();
        store.create_file(root, "A.txt", Vec::new(), None).unwrap();
        store.create_directory(root, "alpha").unwrap();

        let h = harness(store);
        assert_eq!(names(&h.workspace), vec!["alpha", "Zeta", "A.txt", "b.txt"]);
        assert!(h.workspace.selection().is_empty());
        assert_eq!(h.workspace.history().folders(), &[root]);
    }

    #[test]
    fn test_highlight_commands() {
        let mut store = MemoryStore::new();
        let root = store.root();
        for name in ["a", "b", "c", "d"] {
            store.create_file(root, name, Vec::new(), None).unwrap();
        }
        let mut h = harness(store);
        let ws = &mut h.workspace;
        let ids = ws.listing_ids();

        ws.highlight_next();
        assert_eq!(ws.selection().ids(), &ids[..1]);
        ws.highlight_next_page();
        assert_eq!(ws.selection().ids(), &ids[3..]);
        ws.highlight_previous();
        assert_eq!(ws.selection().ids(), &ids[2..3]);
        ws.toggle_range(ids[0]);
        assert_eq!(ws.selection().ids(), &ids[..3]);
        ws.highlight_first();
        assert_eq!(ws.selection().anchor(), Some(ids[0]));
        ws.highlight_last();
        ws.highlight_previous_page();
        assert_eq!(ws.selection().ids(), &ids[..1]);
        ws.toggle(ids[1]);
        assert_eq!(ws.highlighted().len(), 2);
        ws.highlight_all();
        assert_eq!(ws.selection().ids().len(), 4);
        ws.clear_highlight();
        assert!(ws.selection().is_empty());
    }

    #[test]
    fn test_report_forwards_error() {
        let mut h = harness(MemoryStore::new());
        assert_eq!(h.workspace.report(Ok(3)), Some(3));
        assert_eq!(h.workspace.report::<()>(Err(Error::Dismissed)), None);
        assert!(matches!(
            h.requests.try_recv(),
            Ok(UiRequest::Error(message)) if message == "prompt dismissed"
        ));
    }

    #[test]
    fn test_reset_and_load() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let docs = store.create_directory(root, "docs").unwrap();
        let mut h = harness(store);
        let ws = &mut h.workspace;
        ws.highlight(docs);
        ws.copy().unwrap();
        ws.go_into_folder(docs).unwrap();
        assert!(!ws.clipboard().is_empty());

        ws.reset();
        assert_eq!(ws.selected_folder(), ws.root());
        assert_eq!(ws.history().folders(), &[ws.root()]);
        assert!(ws.listing().is_empty());
        assert!(ws.selection().is_empty());
        assert_eq!(ws.selection().anchor(), None);
        assert!(ws.clipboard().is_empty());
    }
}
