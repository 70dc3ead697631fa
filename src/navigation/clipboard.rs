//! Clipboard for cut/copy/paste of entries

use crate::error::{Error, Result};
use crate::store::{ArchiveStore, EntryId, display_name, release};

/// Outcome of a paste: entries that landed and per-entry failures
#[derive(Debug, Default)]
pub struct Paste {
    pub pasted: Vec<EntryId>,
    pub errors: Vec<Error>,
}

/// Cut entries are live references into the tree. Copied entries are detached
/// clones taken at copy time, so later edits to the originals do not leak into
/// a paste.
#[derive(Debug, Default)]
pub struct Clipboard {
    entries: Vec<EntryId>,
    is_cut: bool,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }

    pub fn is_cut(&self) -> bool {
        self.is_cut
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn copy<S: ArchiveStore>(&mut self, store: &mut S, ids: &[EntryId]) -> Result<()> {
        let mut clones = Vec::with_capacity(ids.len());
        for &id in ids {
            match store.clone_entry(id, true) {
                Ok(clone) => clones.push(clone),
                Err(e) => {
                    release(store, &clones);
                    return Err(e.annotate(display_name(store, id)));
                }
            }
        }
        self.replace(store, clones, false);
        Ok(())
    }

    pub fn cut<S: ArchiveStore>(&mut self, store: &mut S, ids: &[EntryId]) {
        self.replace(store, ids.to_vec(), true);
    }

    fn replace<S: ArchiveStore>(&mut self, store: &mut S, entries: Vec<EntryId>, is_cut: bool) {
        let previous = std::mem::replace(&mut self.entries, entries);
        if !self.is_cut {
            release(store, &previous);
        }
        self.is_cut = is_cut;
    }

    /// Forget cut references to entries that were deleted from the tree
    pub fn forget(&mut self, removed: impl Fn(EntryId) -> bool) {
        if self.is_cut {
            self.entries.retain(|&id| !removed(id));
        }
    }

    /// Paste into `dest`. Each entry is applied on its own; failures are
    /// annotated with the entry name and earlier successes are kept.
    pub fn paste_to<S: ArchiveStore>(&mut self, store: &mut S, dest: EntryId) -> Paste {
        if self.is_cut {
            self.paste_cut(store, dest)
        } else {
            self.paste_copy(store, dest)
        }
    }

    fn paste_cut<S: ArchiveStore>(&mut self, store: &mut S, dest: EntryId) -> Paste {
        let mut paste = Paste::default();
        for &entry in &self.entries {
            match store.move_entry(entry, dest) {
                Ok(()) => paste.pasted.push(entry),
                Err(e) => paste.errors.push(e.annotate(display_name(store, entry))),
            }
        }
        paste
    }

    // Clone chain: the staged clone itself is moved into the tree and a fresh
    // clone of it takes its place in the clipboard. The next paste works from
    // that replacement, never from the originally copied entries, and a single
    // paste never leaves two copies behind.
    fn paste_copy<S: ArchiveStore>(&mut self, store: &mut S, dest: EntryId) -> Paste {
        let mut paste = Paste::default();
        let mut staged = Vec::with_capacity(self.entries.len());

        for &entry in &self.entries {
            let name = display_name(store, entry);
            let replacement = match store.clone_entry(entry, true) {
                Ok(replacement) => replacement,
                Err(e) => {
                    paste.errors.push(e.annotate(name));
                    staged.push(entry);
                    continue;
                }
            };
            match store.move_entry(entry, dest) {
                Ok(()) => {
                    paste.pasted.push(entry);
                    staged.push(replacement);
                }
                Err(e) => {
                    release(store, &[replacement]);
                    paste.errors.push(e.annotate(name));
                    staged.push(entry);
                }
            }
        }

        self.entries = staged;
        paste
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn names(store: &MemoryStore, folder: EntryId) -> Vec<String> {
        store
            .children(folder)
            .unwrap()
            .into_iter()
            .map(|id| store.lookup(id).unwrap().name)
            .collect()
    }

    #[test]
    fn test_copy_paste_twice_into_two_folders() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let src = store.create_directory(root, "src").unwrap();
        store.create_file(src, "main.rs", b"fn main() {}".to_vec(), None).unwrap();
        let one = store.create_directory(root, "one").unwrap();
        let two = store.create_directory(root, "two").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.copy(&mut store, &[src]).unwrap();
        assert!(!clipboard.is_cut());

        let first = clipboard.paste_to(&mut store, one);
        assert!(first.errors.is_empty());
        let second = clipboard.paste_to(&mut store, two);
        assert!(second.errors.is_empty());

        assert_eq!(names(&store, one), vec!["src"]);
        assert_eq!(names(&store, two), vec!["src"]);
        assert_ne!(first.pasted, second.pasted);
        assert_eq!(names(&store, first.pasted[0]), vec!["main.rs"]);
        assert_eq!(names(&store, second.pasted[0]), vec!["main.rs"]);
        assert_eq!(names(&store, root), vec!["src", "one", "two"]);
        assert_eq!(clipboard.entries().len(), 1);
    }

    #[test]
    fn test_copy_is_isolated_from_later_edits() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let doc = store.create_file(root, "doc.txt", Vec::new(), None).unwrap();
        let dest = store.create_directory(root, "dest").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.copy(&mut store, &[doc]).unwrap();
        store.remove(doc).unwrap();

        let paste = clipboard.paste_to(&mut store, dest);
        assert!(paste.errors.is_empty());
        assert_eq!(names(&store, dest), vec!["doc.txt"]);
    }

    #[test]
    fn test_copy_paste_collision_keeps_staged_clone() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let doc = store.create_file(root, "doc.txt", Vec::new(), None).unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.copy(&mut store, &[doc]).unwrap();
        let staged = clipboard.entries().to_vec();

        let paste = clipboard.paste_to(&mut store, root);
        assert!(paste.pasted.is_empty());
        assert_eq!(paste.errors.len(), 1);
        assert_eq!(
            paste.errors[0].to_string(),
            "an entry named \"doc.txt\" already exists (doc.txt)"
        );
        assert_eq!(clipboard.entries(), staged.as_slice());
    }

    #[test]
    fn test_cut_paste_partial_failure() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.create_directory(root, "a").unwrap();
        let b = store.create_file(root, "b", Vec::new(), None).unwrap();
        let inner = store.create_directory(a, "inner").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.cut(&mut store, &[b, a]);
        let paste = clipboard.paste_to(&mut store, inner);

        assert_eq!(paste.pasted, vec![b]);
        assert_eq!(paste.errors.len(), 1);
        assert!(paste.errors[0].to_string().ends_with("(a)"));
        assert_eq!(names(&store, inner), vec!["b"]);
        assert!(clipboard.is_cut());
    }

    #[test]
    fn test_cut_paste_into_current_parent_is_idempotent() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let docs = store.create_directory(root, "docs").unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.cut(&mut store, &[docs]);
        let paste = clipboard.paste_to(&mut store, root);
        assert!(paste.errors.is_empty());
        assert_eq!(paste.pasted, vec![docs]);
        assert_eq!(names(&store, root), vec!["docs"]);
    }

    #[test]
    fn test_replacing_copy_releases_clones() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let doc = store.create_file(root, "doc.txt", Vec::new(), None).unwrap();

        let mut clipboard = Clipboard::new();
        clipboard.copy(&mut store, &[doc]).unwrap();
        let staged = clipboard.entries()[0];
        clipboard.cut(&mut store, &[doc]);
        assert!(store.lookup(staged).is_err());

        clipboard.forget(|id| id == doc);
        assert!(clipboard.is_empty());
    }
}
