//! Folder navigation

use super::Workspace;
use crate::error::{Error, Result};
use crate::store::{ArchiveStore, EntryId};

impl<S: ArchiveStore> Workspace<S> {
    /// Open a folder, or extract a file through the download sink
    pub async fn enter_entry(&mut self, id: EntryId) -> Result<()> {
        let info = self.store.lookup(id)?;
        if info.directory {
            self.go_into_folder(id)
        } else {
            self.extract(id, &info.name).await
        }
    }

    pub fn go_into_folder(&mut self, folder: EntryId) -> Result<()> {
        let info = self.store.lookup(folder)?;
        if !info.directory {
            return Err(Error::NotADirectory(info.name));
        }
        self.show_folder(folder)?;
        self.history.enter(folder);
        self.selection.reset();
        tracing::debug!(%folder, "entered folder");
        Ok(())
    }

    /// Go up one level, highlighting the folder we came from
    pub fn go_to_parent(&mut self) -> Result<()> {
        let current = self.selected_folder;
        let Some(parent) = self.store.lookup(current)?.parent else {
            return Ok(());
        };
        self.go_into_folder(parent)?;
        self.selection.highlight(current);
        Ok(())
    }

    pub fn go_back(&mut self) -> Result<()> {
        let left = self.selected_folder;
        if let Some(folder) = self.history.back() {
            self.revisit(folder, left)?;
        }
        Ok(())
    }

    pub fn go_forward(&mut self) -> Result<()> {
        let left = self.selected_folder;
        if let Some(folder) = self.history.forward() {
            self.revisit(folder, left)?;
        }
        Ok(())
    }

    fn revisit(&mut self, folder: EntryId, left: EntryId) -> Result<()> {
        self.show_folder(folder)?;
        self.selection.reset();
        if self.listing.iter().any(|e| e.id == left) {
            self.selection.highlight(left);
        }
        tracing::debug!(%folder, cursor = self.history.cursor(), "history move");
        Ok(())
    }

    fn show_folder(&mut self, folder: EntryId) -> Result<()> {
        let previous = self.selected_folder;
        self.selected_folder = folder;
        if let Err(e) = self.refresh() {
            self.selected_folder = previous;
            self.refresh()?;
            return Err(e);
        }
        Ok(())
    }
}
