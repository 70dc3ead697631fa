//! File and directory handles fed to the import pipeline

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleKind {
    File,
    Directory,
}

/// A loose file ready to be added to the tree
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub modified: Option<SystemTime>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            modified: None,
        }
    }
}

/// Something dropped onto the workspace: a file or a directory to walk
#[allow(async_fn_in_trait)]
pub trait FsHandle: Sized {
    fn kind(&self) -> HandleKind;

    fn name(&self) -> String;

    async fn read_file(&self) -> Result<SourceFile>;

    /// Direct children of a directory handle, sorted by name
    async fn children(&self) -> Result<Vec<Self>>;
}

/// Handle on the local filesystem
#[derive(Clone, Debug)]
pub struct LocalHandle {
    path: PathBuf,
    kind: HandleKind,
}

impl LocalHandle {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        let kind = if metadata.is_dir() {
            HandleKind::Directory
        } else {
            HandleKind::File
        };
        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FsHandle for LocalHandle {
    fn kind(&self) -> HandleKind {
        self.kind
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    async fn read_file(&self) -> Result<SourceFile> {
        if self.kind == HandleKind::Directory {
            return Err(Error::IsADirectory(self.name()));
        }
        let bytes = tokio::fs::read(&self.path).await?;
        let modified = tokio::fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok());
        Ok(SourceFile {
            name: self.name(),
            bytes,
            modified,
        })
    }

    async fn children(&self) -> Result<Vec<Self>> {
        if self.kind == HandleKind::File {
            return Err(Error::NotADirectory(self.name()));
        }
        let root = self.path.clone();
        let children = tokio::task::spawn_blocking(move || list_dir(&root))
            .await
            .map_err(std::io::Error::other)??;
        Ok(children)
    }
}

fn list_dir(path: &Path) -> std::io::Result<Vec<LocalHandle>> {
    WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry?;
            let kind = if entry.file_type().is_dir() {
                HandleKind::Directory
            } else {
                HandleKind::File
            };
            Ok(LocalHandle {
                path: entry.into_path(),
                kind,
            })
        })
        .collect()
}
