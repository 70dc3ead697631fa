//! Import pipeline: loose files, dropped directories and archives
//!
//! Archives with encrypted entries are imported in attempts. An attempt
//! without a password that turns up protected entries is rolled back and the
//! user is asked for a password, which is checked against detached copies of
//! those entries before the next attempt uses it.

use std::future::Future;
use std::pin::Pin;

use crate::archive;
use crate::error::{Error, Result};
use crate::handle::{FsHandle, HandleKind, SourceFile};
use crate::store::{ArchiveStore, EntryId, release};
use crate::ui::{ImportChoice, PasswordPurpose};
use crate::workspace::{Workspace, collect_errors};

impl<S: ArchiveStore> Workspace<S> {
    /// Add loose files to the selected folder.
    ///
    /// A single file with an archive extension asks whether to add it as a
    /// file or import its contents, unless `force_raw` is set.
    pub async fn add_files(&mut self, files: Vec<SourceFile>, force_raw: bool) -> Result<()> {
        if !force_raw
            && let [file] = files.as_slice()
            && archive::is_archive_name(&file.name)
        {
            match self.ui.choose_action(&file.name).await {
                Ok(ImportChoice::ImportArchive) => {
                    return self.import_archive(&file.bytes, None).await;
                }
                Ok(ImportChoice::AddAsFile) => {}
                Err(Error::Dismissed) => return Ok(()),
                Err(e) => return Err(e),
            }
        }

        let (added, errors) = self.create_files(files);
        self.refresh()?;
        if !added.is_empty() {
            self.highlight_added(&added);
        }
        collect_errors("add files", errors)
    }

    /// Add dropped files and directories, walking directories depth first.
    ///
    /// A failing entry aborts its own branch only. Entries ingested before the
    /// failure stay in the tree.
    pub async fn drop_items<H: FsHandle>(&mut self, items: &[H]) -> Result<()> {
        let folder = self.selected_folder;
        let mut files = Vec::new();
        let mut added = Vec::new();
        let mut errors = Vec::new();
        let mut has_directories = false;

        for item in items {
            match item.kind() {
                HandleKind::File => match item.read_file().await {
                    Ok(file) => files.push(file),
                    Err(e) => errors.push(e.annotate(item.name())),
                },
                HandleKind::Directory => {
                    has_directories = true;
                    match ingest(&mut self.store, folder, item).await {
                        Ok(id) => added.push(id),
                        Err(e) => errors.push(e),
                    }
                }
            }
        }

        if !has_directories && errors.is_empty() {
            return self.add_files(files, false).await;
        }

        let (created, failed) = self.create_files(files);
        added.extend(created);
        errors.extend(failed);
        self.refresh()?;
        if !added.is_empty() {
            self.highlight_added(&added);
        }
        tracing::info!(added = added.len(), failed = errors.len(), "items dropped");
        collect_errors("drop", errors)
    }

    /// Import an archive into the selected folder, prompting for a password
    /// when protected entries show up and none was given
    pub async fn import_archive(&mut self, blob: &[u8], password: Option<String>) -> Result<()> {
        let folder = self.selected_folder;
        let before = self.store.children(folder)?;
        let mut password = password.filter(|p| !p.is_empty());

        loop {
            tracing::debug!(%folder, protected = password.is_some(), "import attempt");
            let created = match self
                .store
                .import_archive(folder, blob, password.as_deref())
                .await
            {
                Ok(created) => created,
                Err(e) => {
                    self.finish_import(&before)?;
                    return Err(e);
                }
            };

            if password.is_some() {
                break;
            }
            let protected = self.protected_entries(&created).await?;
            if protected.is_empty() {
                break;
            }

            let probes = protected
                .iter()
                .map(|&id| self.store.clone_entry(id, false))
                .collect::<Result<Vec<_>>>()?;
            self.rollback(&created);
            tracing::info!(protected = probes.len(), "archive is password protected");

            let answer = self.validate_password(&probes).await;
            release(&mut self.store, &probes);
            match answer {
                Ok(Some(accepted)) => password = Some(accepted),
                Ok(None) => self.ui.display_error(&Error::WrongPassword),
                Err(e) => {
                    self.refresh()?;
                    return Err(e);
                }
            }
        }

        self.finish_import(&before)
    }

    fn create_files(&mut self, files: Vec<SourceFile>) -> (Vec<EntryId>, Vec<Error>) {
        let mut added = Vec::new();
        let mut errors = Vec::new();
        for file in files {
            match self
                .store
                .create_file(self.selected_folder, &file.name, file.bytes, file.modified)
            {
                Ok(id) => added.push(id),
                Err(e) => errors.push(e.annotate(file.name)),
            }
        }
        (added, errors)
    }

    async fn protected_entries(&self, created: &[EntryId]) -> Result<Vec<EntryId>> {
        let mut protected = Vec::new();
        for &id in created {
            if !self.store.lookup(id)?.directory && self.store.is_password_protected(id).await? {
                protected.push(id);
            }
        }
        Ok(protected)
    }

    /// Undo an attempt. Directories go only once empty, so folders that
    /// already existed and got merged into stay.
    fn rollback(&mut self, created: &[EntryId]) {
        for &id in created.iter().rev() {
            let keep = match self.store.lookup(id) {
                Ok(info) if info.directory => self
                    .store
                    .children(id)
                    .map(|c| !c.is_empty())
                    .unwrap_or(true),
                Ok(_) => false,
                Err(_) => true,
            };
            if !keep && let Err(e) = self.store.remove(id) {
                tracing::warn!(%id, error = %e, "rollback failed");
            }
        }
    }

    /// Prompt once. `None` when the password fails on any protected entry.
    async fn validate_password(&mut self, probes: &[EntryId]) -> Result<Option<String>> {
        let candidate = self.ui.password(PasswordPurpose::Import).await?;
        for &probe in probes {
            if !self.store.check_password(probe, &candidate).await? {
                return Ok(None);
            }
        }
        Ok(Some(candidate))
    }

    fn finish_import(&mut self, before: &[EntryId]) -> Result<()> {
        let added: Vec<EntryId> = self
            .store
            .children(self.selected_folder)?
            .into_iter()
            .filter(|id| !before.contains(id))
            .collect();
        self.refresh()?;
        if !added.is_empty() {
            self.highlight_added(&added);
        }
        tracing::info!(added = added.len(), "import finished");
        Ok(())
    }
}

type Ingest<'a> = Pin<Box<dyn Future<Output = Result<EntryId>> + 'a>>;

/// Create `handle` under `folder`, recursing into directories
fn ingest<'a, S: ArchiveStore, H: FsHandle>(
    store: &'a mut S,
    folder: EntryId,
    handle: &'a H,
) -> Ingest<'a> {
    Box::pin(async move {
        let name = handle.name();
        let result = match handle.kind() {
            HandleKind::Directory => match store.create_directory(folder, &name) {
                Ok(dir) => {
                    let mut outcome = Ok(dir);
                    match handle.children().await {
                        Ok(children) => {
                            for child in &children {
                                if let Err(e) = ingest(&mut *store, dir, child).await {
                                    outcome = Err(e);
                                    break;
                                }
                            }
                        }
                        Err(e) => outcome = Err(e),
                    }
                    outcome
                }
                Err(e) => Err(e),
            },
            HandleKind::File => match handle.read_file().await {
                Ok(file) => store.create_file(folder, &name, file.bytes, file.modified),
                Err(e) => Err(e),
            },
        };
        result.map_err(|e| e.annotate(name))
    })
}
