//! Tree edits on the selected folder: create, rename, delete, cut/copy/paste

use super::{Workspace, collect_errors};
use crate::error::Result;
use crate::navigation::Selection;
use crate::store::{ArchiveStore, EntryId, display_name};

impl<S: ArchiveStore> Workspace<S> {
    pub fn create_folder(&mut self, name: &str) -> Result<EntryId> {
        let folder = self.store.create_directory(self.selected_folder, name)?;
        self.refresh()?;
        self.selection.highlight(folder);
        tracing::debug!(%folder, name, "folder created");
        Ok(folder)
    }

    /// Rename the first highlighted entry
    pub fn rename(&mut self, name: &str) -> Result<()> {
        let Some(entry) = self.highlighted().first().map(|e| e.id) else {
            return Ok(());
        };
        self.store.rename(entry, name)?;
        self.refresh()
    }

    /// Remove the highlighted entries, then repair history, clipboard and highlight
    pub fn delete(&mut self) -> Result<()> {
        let targets = self.highlighted_ids();
        if targets.is_empty() {
            return Ok(());
        }
        let listing = self.listing_ids();
        let tracked: Vec<EntryId> = self
            .history
            .folders()
            .iter()
            .chain(self.clipboard.entries())
            .copied()
            .collect();

        let mut removed = Vec::new();
        let mut errors = Vec::new();
        for &id in &targets {
            // Descendants have to be resolved while the subtree still exists
            let covered: Vec<EntryId> = tracked
                .iter()
                .copied()
                .filter(|&t| t == id || self.store.is_descendant_of(t, id))
                .collect();
            let name = display_name(&self.store, id);
            match self.store.remove(id) {
                Ok(()) => {
                    removed.push(id);
                    removed.extend(covered);
                }
                Err(e) => errors.push(e.annotate(name)),
            }
        }

        let root = self.store.root();
        self.history.prune(root, |f| removed.contains(&f));
        self.clipboard.forget(|id| removed.contains(&id));
        if removed.contains(&self.selected_folder) {
            self.selected_folder = self.history.current();
        }
        self.refresh()?;

        match Selection::next_after_delete(&listing, &removed) {
            Some(next) if self.listing.iter().any(|e| e.id == next) => {
                self.selection.highlight(next)
            }
            _ if self.listing.is_empty() => self.selection.reset(),
            _ => {}
        }
        tracing::info!(removed = removed.len(), "entries deleted");
        collect_errors("delete", errors)
    }

    pub fn copy(&mut self) -> Result<()> {
        let ids = self.highlighted_ids();
        self.clipboard.copy(&mut self.store, &ids)?;
        tracing::debug!(entries = ids.len(), "copied");
        Ok(())
    }

    pub fn cut(&mut self) {
        let ids = self.highlighted_ids();
        self.clipboard.cut(&mut self.store, &ids);
        tracing::debug!(entries = ids.len(), "cut");
    }

    /// Paste the clipboard into the selected folder and highlight what landed
    pub fn paste(&mut self) -> Result<()> {
        let paste = self.clipboard.paste_to(&mut self.store, self.selected_folder);
        self.refresh()?;
        self.selection.set(paste.pasted.clone());
        tracing::info!(
            pasted = paste.pasted.len(),
            failed = paste.errors.len(),
            cut = self.clipboard.is_cut(),
            "paste"
        );
        collect_errors("paste", paste.errors)
    }
}
