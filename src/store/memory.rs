//! In-memory entry tree backed by the blob codec

use std::collections::HashMap;
use std::time::SystemTime;

use super::codec::{self, RawEntry};
use super::crypto::{Seal, SealKey};
use super::{ArchiveStore, EntryId, EntryInfo, EntryMeta, ExportOptions};
use crate::downloads::DownloadHandle;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
struct FileData {
    bytes: Vec<u8>,
    modified: Option<SystemTime>,
    /// Set while `bytes` are still sealed with an unknown password
    sealed: Option<Seal>,
}

#[derive(Clone, Debug)]
struct Node {
    name: String,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
    file: Option<FileData>,
}

impl Node {
    fn is_dir(&self) -> bool {
        self.file.is_none()
    }
}

/// Reference store keeping the whole tree in memory
pub struct MemoryStore {
    nodes: HashMap<EntryId, Node>,
    root: EntryId,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let root = EntryId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                name: String::new(),
                parent: None,
                children: Vec::new(),
                file: None,
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    /// Open an archive blob as a fresh tree
    pub async fn open(blob: &[u8], password: Option<&str>) -> Result<Self> {
        let mut store = Self::new();
        let root = store.root;
        store.import_archive(root, blob, password).await?;
        Ok(store)
    }

    fn node(&self, id: EntryId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(Error::UnknownEntry(id))
    }

    fn node_mut(&mut self, id: EntryId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(Error::UnknownEntry(id))
    }

    fn folder(&self, id: EntryId) -> Result<&Node> {
        let node = self.node(id)?;
        if node.is_dir() {
            Ok(node)
        } else {
            Err(Error::NotADirectory(node.name.clone()))
        }
    }

    fn child_named(&self, folder: EntryId, name: &str) -> Result<Option<EntryId>> {
        Ok(self
            .folder(folder)?
            .children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child).is_some_and(|n| n.name == name)))
    }

    fn insert(&mut self, node: Node) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        if let Some(parent) = node.parent
            && let Some(parent) = self.nodes.get_mut(&parent)
        {
            parent.children.push(id);
        }
        self.nodes.insert(id, node);
        id
    }

    fn create(&mut self, folder: EntryId, name: &str, file: Option<FileData>) -> Result<EntryId> {
        validate_name(name)?;
        if self.child_named(folder, name)?.is_some() {
            return Err(Error::NameCollision(name.to_string()));
        }
        Ok(self.insert(Node {
            name: name.to_string(),
            parent: Some(folder),
            children: Vec::new(),
            file,
        }))
    }

    fn clone_subtree(&mut self, id: EntryId, parent: Option<EntryId>, deep: bool) -> Result<EntryId> {
        let source = self.node(id)?.clone();
        let copy = self.insert(Node {
            children: Vec::new(),
            parent,
            ..source.clone()
        });
        if deep {
            for child in source.children {
                self.clone_subtree(child, Some(copy), true)?;
            }
        }
        Ok(copy)
    }

    /// Entries of a subtree with paths relative to `folder`, parents first
    fn collect(&self, folder: EntryId, prefix: &str, out: &mut Vec<(String, EntryId)>) -> Result<()> {
        for &child in &self.folder(folder)?.children {
            let node = self.node(child)?;
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{prefix}/{}", node.name)
            };
            out.push((path.clone(), child));
            if node.is_dir() {
                self.collect(child, &path, out)?;
            }
        }
        Ok(())
    }

    fn materialize(
        &mut self,
        folder: EntryId,
        raw: RawEntry,
        password: Option<&str>,
        created: &mut Vec<EntryId>,
    ) -> Result<()> {
        let parts: Vec<String> = raw
            .path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let Some((name, dirs)) = parts.split_last() else {
            return Err(Error::format(Some(raw.path.clone()), "empty entry path"));
        };

        let mut parent = folder;
        for dir in dirs {
            parent = match self.child_named(parent, dir)? {
                Some(existing) if self.node(existing)?.is_dir() => existing,
                Some(_) => return Err(Error::NameCollision(dir.to_string())),
                None => {
                    let id = self.create(parent, dir, None)?;
                    created.push(id);
                    id
                }
            };
        }

        if raw.directory {
            match self.child_named(parent, name)? {
                Some(existing) if self.node(existing)?.is_dir() => {}
                Some(_) => return Err(Error::NameCollision(name.to_string())),
                None => created.push(self.create(parent, name, None)?),
            }
            return Ok(());
        }

        let file = match (raw.seal, password) {
            (Some(seal), Some(password)) => {
                let key = SealKey::for_seal(password, &seal)?;
                if !key.matches(&seal) {
                    return Err(Error::WrongPassword);
                }
                FileData {
                    bytes: key.open(&raw.data)?,
                    modified: raw.modified,
                    sealed: None,
                }
            }
            (sealed, _) => FileData {
                bytes: raw.data,
                modified: raw.modified,
                sealed,
            },
        };
        created.push(self.create(parent, name, Some(file))?);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

impl ArchiveStore for MemoryStore {
    fn root(&self) -> EntryId {
        self.root
    }

    fn lookup(&self, id: EntryId) -> Result<EntryInfo> {
        let node = self.node(id)?;
        Ok(EntryInfo {
            id,
            name: node.name.clone(),
            directory: node.is_dir(),
            parent: node.parent,
            meta: node.file.as_ref().map(|file| EntryMeta {
                last_modified: file.modified,
                compressed_size: file.bytes.len() as u64,
                uncompressed_size: file.bytes.len() as u64,
            }),
        })
    }

    fn children(&self, folder: EntryId) -> Result<Vec<EntryId>> {
        Ok(self.folder(folder)?.children.clone())
    }

    fn is_descendant_of(&self, id: EntryId, ancestor: EntryId) -> bool {
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        false
    }

    fn move_entry(&mut self, id: EntryId, dest: EntryId) -> Result<()> {
        let node = self.node(id)?;
        let name = node.name.clone();
        let old_parent = node.parent;
        self.folder(dest)?;

        if id == self.root || dest == id || self.is_descendant_of(dest, id) {
            return Err(Error::MoveIntoDescendant(name));
        }
        if old_parent == Some(dest) {
            return Ok(());
        }
        if self.child_named(dest, &name)?.is_some() {
            return Err(Error::NameCollision(name));
        }

        if let Some(old_parent) = old_parent {
            self.node_mut(old_parent)?.children.retain(|&c| c != id);
        }
        self.node_mut(dest)?.children.push(id);
        self.node_mut(id)?.parent = Some(dest);
        Ok(())
    }

    fn clone_entry(&mut self, id: EntryId, deep: bool) -> Result<EntryId> {
        if id == self.root {
            return Err(Error::RootEntry("copied"));
        }
        self.clone_subtree(id, None, deep)
    }

    fn remove(&mut self, id: EntryId) -> Result<()> {
        if id == self.root {
            return Err(Error::RootEntry("removed"));
        }
        let node = self.nodes.remove(&id).ok_or(Error::UnknownEntry(id))?;
        if let Some(parent) = node.parent
            && let Some(parent) = self.nodes.get_mut(&parent)
        {
            parent.children.retain(|&c| c != id);
        }
        let mut pending = node.children;
        while let Some(child) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                pending.extend(removed.children);
            }
        }
        Ok(())
    }

    fn rename(&mut self, id: EntryId, name: &str) -> Result<()> {
        if id == self.root {
            return Err(Error::RootEntry("renamed"));
        }
        validate_name(name)?;
        let node = self.node(id)?;
        if node.name == name {
            return Ok(());
        }
        if let Some(parent) = node.parent
            && self.child_named(parent, name)?.is_some()
        {
            return Err(Error::NameCollision(name.to_string()));
        }
        self.node_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn create_directory(&mut self, folder: EntryId, name: &str) -> Result<EntryId> {
        self.create(folder, name, None)
    }

    fn create_file(
        &mut self,
        folder: EntryId,
        name: &str,
        bytes: Vec<u8>,
        modified: Option<SystemTime>,
    ) -> Result<EntryId> {
        self.create(
            folder,
            name,
            Some(FileData {
                bytes,
                modified,
                sealed: None,
            }),
        )
    }

    async fn import_archive(
        &mut self,
        folder: EntryId,
        blob: &[u8],
        password: Option<&str>,
    ) -> Result<Vec<EntryId>> {
        self.folder(folder)?;
        let entries = codec::decode(blob)?;
        let mut created = Vec::with_capacity(entries.len());
        for raw in entries {
            let path = raw.path.clone();
            self.materialize(folder, raw, password, &mut created)
                .map_err(|e| e.annotate(path))?;
            tokio::task::yield_now().await;
        }
        Ok(created)
    }

    async fn export_folder(
        &self,
        folder: EntryId,
        options: &ExportOptions,
        download: &DownloadHandle,
    ) -> Result<Vec<u8>> {
        let mut paths = Vec::new();
        self.collect(folder, "", &mut paths)?;
        if !options.keep_order {
            paths.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let total: u64 = paths
            .iter()
            .filter_map(|(_, id)| self.nodes.get(id)?.file.as_ref())
            .map(|f| f.bytes.len() as u64)
            .sum();
        let mut done = 0;
        let mut raw_entries = Vec::with_capacity(paths.len());

        // Everything is assembled in memory before any byte is handed out, so
        // `buffered_write` has no observable effect here.
        for (path, id) in paths {
            download.check_aborted()?;
            let node = self.node(id)?;
            let raw = match &node.file {
                None => RawEntry {
                    path,
                    directory: true,
                    modified: None,
                    seal: None,
                    data: Vec::new(),
                },
                Some(file) => {
                    done += file.bytes.len() as u64;
                    seal_for_export(path, file, options.password.as_deref())?
                }
            };
            raw_entries.push(raw);
            download.progress(done, total);
            tokio::task::yield_now().await;
        }

        download.check_aborted()?;
        codec::encode(&raw_entries)
    }

    async fn read_file(&self, id: EntryId, download: &DownloadHandle) -> Result<Vec<u8>> {
        let node = self.node(id)?;
        let file = node
            .file
            .as_ref()
            .ok_or_else(|| Error::IsADirectory(node.name.clone()))?;
        if file.sealed.is_some() {
            return Err(Error::WrongPassword.annotate(node.name.clone()));
        }
        download.check_aborted()?;
        download.progress(file.bytes.len() as u64, file.bytes.len() as u64);
        Ok(file.bytes.clone())
    }

    async fn is_password_protected(&self, id: EntryId) -> Result<bool> {
        Ok(self
            .node(id)?
            .file
            .as_ref()
            .is_some_and(|f| f.sealed.is_some()))
    }

    async fn check_password(&self, id: EntryId, candidate: &str) -> Result<bool> {
        let node = self.node(id)?;
        Ok(match &node.file {
            Some(FileData {
                sealed: Some(seal),
                ..
            }) => SealKey::for_seal(candidate, seal)?.matches(seal),
            _ => true,
        })
    }
}

// Entries still sealed with an unknown password are copied through as-is.
fn seal_for_export(path: String, file: &FileData, password: Option<&str>) -> Result<RawEntry> {
    let (seal, data) = match (file.sealed, password) {
        (Some(seal), _) => (Some(seal), file.bytes.clone()),
        (None, Some(password)) if !password.is_empty() => {
            let key = SealKey::generate(password).map_err(|e| e.annotate(path.clone()))?;
            let data = key.seal(&file.bytes).map_err(|e| e.annotate(path.clone()))?;
            (Some(key.seal_info()), data)
        }
        (None, _) => (None, file.bytes.clone()),
    };
    Ok(RawEntry {
        path,
        directory: false,
        modified: file.modified,
        seal,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloads::Downloads;

    fn names(store: &MemoryStore, folder: EntryId) -> Vec<String> {
        store
            .children(folder)
            .unwrap()
            .into_iter()
            .map(|id| store.lookup(id).unwrap().name)
            .collect()
    }

    #[test]
    fn test_create_and_collision() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let docs = store.create_directory(root, "docs").unwrap();
        store.create_file(docs, "a.txt", b"a".to_vec(), None).unwrap();

        assert!(matches!(
            store.create_directory(root, "docs"),
            Err(Error::NameCollision(_))
        ));
        assert!(matches!(
            store.create_file(root, "", Vec::new(), None),
            Err(Error::InvalidName(_))
        ));
        assert_eq!(names(&store, docs), vec!["a.txt"]);
        assert!(store.lookup(docs).unwrap().meta.is_none());
        assert_eq!(
            store.lookup(store.children(docs).unwrap()[0]).unwrap().meta.unwrap().uncompressed_size,
            1
        );
    }

    #[test]
    fn test_move_rules() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.create_directory(root, "a").unwrap();
        let b = store.create_directory(a, "b").unwrap();

        assert!(matches!(store.move_entry(a, b), Err(Error::MoveIntoDescendant(_))));
        assert!(matches!(store.move_entry(a, a), Err(Error::MoveIntoDescendant(_))));
        store.move_entry(a, root).unwrap();
        assert_eq!(names(&store, root), vec!["a"]);

        store.move_entry(b, root).unwrap();
        assert_eq!(names(&store, root), vec!["a", "b"]);
        assert!(names(&store, a).is_empty());
        assert!(!store.is_descendant_of(b, a));
        assert!(store.is_descendant_of(b, root));
    }

    #[test]
    fn test_clone_is_detached_and_ids_not_reused() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.create_directory(root, "a").unwrap();
        store.create_file(a, "f", b"x".to_vec(), None).unwrap();

        let copy = store.clone_entry(a, true).unwrap();
        assert_eq!(store.lookup(copy).unwrap().parent, None);
        assert_eq!(names(&store, copy), vec!["f"]);
        assert_eq!(names(&store, root), vec!["a"]);

        store.remove(a).unwrap();
        assert!(matches!(store.lookup(a), Err(Error::UnknownEntry(_))));
        let again = store.create_directory(root, "a").unwrap();
        assert!(again > copy);
        assert!(matches!(store.remove(root), Err(Error::RootEntry(_))));
    }

    #[test]
    fn test_rename() {
        let mut store = MemoryStore::new();
        let root = store.root();
        let a = store.create_file(root, "a", Vec::new(), None).unwrap();
        store.create_file(root, "b", Vec::new(), None).unwrap();

        assert!(matches!(store.rename(a, "b"), Err(Error::NameCollision(_))));
        store.rename(a, "a").unwrap();
        store.rename(a, "c").unwrap();
        assert_eq!(names(&store, root), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_export_import_roundtrip() {
        let downloads = Downloads::new();
        let mut store = MemoryStore::new();
        let root = store.root();
        let docs = store.create_directory(root, "docs").unwrap();
        store.create_file(docs, "readme.md", b"hello".to_vec(), None).unwrap();
        store.create_file(root, "top.txt", b"top".to_vec(), None).unwrap();

        let handle = downloads.sink().begin("out.zip");
        let blob = store
            .export_folder(root, &ExportOptions::default(), &handle)
            .await
            .unwrap();
        handle.complete_or_abort(Ok(Vec::new())).unwrap();

        let reopened = MemoryStore::open(&blob, None).await.unwrap();
        let root = reopened.root();
        assert_eq!(names(&reopened, root), vec!["docs", "top.txt"]);
    }

    #[tokio::test]
    async fn test_protected_import() {
        let downloads = Downloads::new();
        let mut store = MemoryStore::new();
        let root = store.root();
        store.create_file(root, "secret.txt", b"data".to_vec(), None).unwrap();
        let options = ExportOptions {
            password: Some("pw".to_string()),
            ..ExportOptions::default()
        };
        let handle = downloads.sink().begin("s.zip");
        let blob = store.export_folder(root, &options, &handle).await.unwrap();
        drop(handle);

        let locked = MemoryStore::open(&blob, None).await.unwrap();
        let entry = locked.children(locked.root()).unwrap()[0];
        assert!(locked.is_password_protected(entry).await.unwrap());
        assert!(locked.check_password(entry, "pw").await.unwrap());
        assert!(!locked.check_password(entry, "nope").await.unwrap());

        let err = MemoryStore::open(&blob, Some("nope")).await.err().unwrap();
        assert_eq!(err.to_string(), "invalid password (secret.txt)");

        assert!(!blob.windows(4).any(|w| w == b"data"));

        let unlocked = MemoryStore::open(&blob, Some("pw")).await.unwrap();
        let entry = unlocked.children(unlocked.root()).unwrap()[0];
        assert!(!unlocked.is_password_protected(entry).await.unwrap());
        let handle = downloads.sink().begin("secret.txt");
        assert_eq!(unlocked.read_file(entry, &handle).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_import_merges_existing_folders() {
        let downloads = Downloads::new();
        let mut source = MemoryStore::new();
        let root = source.root();
        let docs = source.create_directory(root, "docs").unwrap();
        source.create_file(docs, "new.md", Vec::new(), None).unwrap();
        let handle = downloads.sink().begin("a.zip");
        let blob = source
            .export_folder(root, &ExportOptions::default(), &handle)
            .await
            .unwrap();

        let mut target = MemoryStore::new();
        let root = target.root();
        let docs = target.create_directory(root, "docs").unwrap();
        let created = target.import_archive(root, &blob, None).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(names(&target, docs), vec!["new.md"]);

        let err = target.import_archive(root, &blob, None).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Structural);
        assert!(err.to_string().ends_with("(docs/new.md)"));
    }

    #[tokio::test]
    async fn test_export_fails_on_overlong_path() {
        let downloads = Downloads::new();
        let mut store = MemoryStore::new();
        let root = store.root();
        let name = "n".repeat(70_000);
        store.create_file(root, &name, b"x".to_vec(), None).unwrap();

        let handle = downloads.sink().begin("long.zip");
        let err = store
            .export_folder(root, &ExportOptions::default(), &handle)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Format);
    }
}
