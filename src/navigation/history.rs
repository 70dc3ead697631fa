//! Back/forward history of visited folders

use crate::store::EntryId;

#[derive(Clone, Debug)]
pub struct History {
    folders: Vec<EntryId>,
    cursor: usize,
}

impl History {
    pub fn new(root: EntryId) -> Self {
        Self {
            folders: vec![root],
            cursor: 0,
        }
    }

    pub fn current(&self) -> EntryId {
        self.folders[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn folders(&self) -> &[EntryId] {
        &self.folders
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.folders.len()
    }

    /// Record a visit, dropping any forward entries
    pub fn enter(&mut self, folder: EntryId) {
        if self.current() == folder {
            return;
        }
        self.folders.truncate(self.cursor + 1);
        self.folders.push(folder);
        self.cursor += 1;
    }

    pub fn back(&mut self) -> Option<EntryId> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn forward(&mut self) -> Option<EntryId> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Rebuild the history after a deletion.
    ///
    /// `removed` answers whether a folder is one of the deleted entries or lies
    /// below one. Dropped entries can leave the same folder twice in a row, the
    /// second copy is dropped too. The cursor moves left by the number of
    /// entries dropped at or before it.
    pub fn prune(&mut self, root: EntryId, removed: impl Fn(EntryId) -> bool) {
        let mut kept: Vec<EntryId> = Vec::with_capacity(self.folders.len());
        let mut offset = 0;

        for (index, &folder) in self.folders.iter().enumerate() {
            let dropped = removed(folder) || kept.last() == Some(&folder);
            if dropped {
                if index <= self.cursor {
                    offset += 1;
                }
            } else {
                kept.push(folder);
            }
        }

        if kept.is_empty() {
            kept.push(root);
        }
        self.cursor = self.cursor.saturating_sub(offset).min(kept.len() - 1);
        self.folders = kept;
    }
}
