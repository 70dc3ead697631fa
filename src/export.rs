//! Export pipeline: folders to archive downloads, files to plain downloads

use crate::archive;
use crate::error::Result;
use crate::store::{ArchiveStore, EntryId, ExportOptions};
use crate::ui::PasswordPurpose;
use crate::workspace::Workspace;

impl<S: ArchiveStore> Workspace<S> {
    /// File name offered when exporting `folder`
    pub fn default_export_filename(&self, folder: EntryId) -> Result<String> {
        let info = self.store.lookup(folder)?;
        if info.parent.is_none() || info.name.is_empty() {
            Ok(self.options.root_filename.clone())
        } else {
            Ok(archive::archive_filename(&info.name))
        }
    }

    /// Password for an export when the caller did not give one
    pub async fn export_password(&self) -> Result<Option<String>> {
        if !self.options.prompt_for_export_password {
            return Ok(self.options.default_password());
        }
        let password = self.ui.password(PasswordPurpose::Export).await?;
        Ok((!password.is_empty()).then_some(password))
    }

    /// Serialize `folder` into a download named `filename`.
    ///
    /// The download is released on every path. An abort requested through the
    /// download list stops the export at the next entry and publishes nothing.
    pub async fn export_folder(
        &self,
        folder: EntryId,
        filename: &str,
        password: Option<String>,
    ) -> Result<()> {
        let options = ExportOptions {
            password: password.filter(|p| !p.is_empty()),
            buffered_write: self.options.buffered_write,
            keep_order: self.options.keep_order,
        };
        let download = self.downloads.begin(filename);
        tracing::info!(
            %folder,
            filename,
            protected = options.password.is_some(),
            "export started"
        );
        let result = self.store.export_folder(folder, &options, &download).await;
        download.complete_or_abort(result)
    }

    /// Export the selected folder under its default name
    pub async fn export_selected_folder(&self) -> Result<()> {
        let folder = self.selected_folder;
        let filename = self.default_export_filename(folder)?;
        let password = self.export_password().await?;
        self.export_folder(folder, &filename, password).await
    }

    /// Download the contents of a single file entry
    pub async fn extract(&self, entry: EntryId, filename: &str) -> Result<()> {
        let download = self.downloads.begin(filename);
        tracing::debug!(%entry, filename, "extract started");
        let result = self.store.read_file(entry, &download).await;
        download.complete_or_abort(result)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Options;
    use crate::error::Error;
    use crate::store::{ArchiveStore, MemoryStore};
    use crate::ui::{PasswordPurpose, UiRequest};
    use crate::workspace::tests::{harness, names};

    fn sample() -> MemoryStore {
        let mut store = MemoryStore::new();
        let root = store.root();
        let docs = store.create_directory(root, "docs").unwrap();
        store.create_file(docs, "readme.md", b"hello".to_vec(), None).unwrap();
        store.create_file(root, "top.txt", b"top".to_vec(), None).unwrap();
        store
    }

    #[test]
    fn test_default_export_filename() {
        let h = harness(sample());
        let ws = &h.workspace;
        let docs = ws.listing()[0].id;
        assert_eq!(ws.default_export_filename(docs).unwrap(), "docs.zip");
        assert_eq!(ws.default_export_filename(ws.root()).unwrap(), "archive.zip");
    }

    #[tokio::test]
    async fn test_export_then_import_keeps_names() {
        let mut h = harness(sample());
        let root = h.workspace.root();
        h.workspace.export_folder(root, "out.zip", None).await.unwrap();
        h.downloads.poll_updates();
        let id = h.downloads.all()[0].id;
        assert_eq!(h.downloads.get(id).unwrap().mime_type, "application/zip");
        let blob = h.downloads.take_output(id).unwrap();

        let mut target = harness(MemoryStore::new());
        target.workspace.import_archive(&blob, None).await.unwrap();
        assert_eq!(names(&target.workspace), vec!["docs", "top.txt"]);
        assert_eq!(names(&h.workspace), names(&target.workspace));
    }

    #[tokio::test]
    async fn test_export_prompts_for_password() {
        let mut h = harness(sample());
        let ws = &h.workspace;
        let requests = &mut h.requests;
        let responder = async {
            match requests.recv().await {
                Some(UiRequest::Password { purpose, reply }) => {
                    assert_eq!(purpose, PasswordPurpose::Export);
                    reply.send("pw".to_string()).unwrap();
                }
                other => panic!("unexpected request: {other:?}"),
            }
        };
        let (result, ()) = tokio::join!(ws.export_selected_folder(), responder);
        result.unwrap();

        h.downloads.poll_updates();
        let download = &h.downloads.all()[0];
        assert_eq!(download.name, "archive.zip");
        let id = download.id;
        let blob = h.downloads.take_output(id).unwrap();
        let locked = MemoryStore::open(&blob, None).await.unwrap();
        let docs = locked.children(locked.root()).unwrap()[0];
        let readme = locked.children(docs).unwrap()[0];
        assert!(locked.is_password_protected(readme).await.unwrap());
    }

    #[tokio::test]
    async fn test_export_dismissed_prompt_starts_nothing() {
        let mut h = harness(sample());
        let ws = &h.workspace;
        let requests = &mut h.requests;
        let responder = async {
            if let Some(UiRequest::Password { reply, .. }) = requests.recv().await {
                drop(reply);
            }
        };
        let (result, ()) = tokio::join!(ws.export_selected_folder(), responder);
        assert!(matches!(result, Err(Error::Dismissed)));
        h.downloads.poll_updates();
        assert!(h.downloads.all().is_empty());
    }

    #[tokio::test]
    async fn test_export_uses_default_password_without_prompt() {
        let mut h = harness(sample());
        h.workspace.set_options(Options {
            prompt_for_export_password: false,
            default_export_password: String::new(),
            ..Options::default()
        });
        h.workspace.export_selected_folder().await.unwrap();
        assert!(h.requests.try_recv().is_err());
        h.downloads.poll_updates();
        assert!(h.downloads.all()[0].is_complete());
    }

    #[tokio::test]
    async fn test_aborted_export_publishes_nothing() {
        let mut h = harness(sample());
        let root = h.workspace.root();
        let export = h.workspace.export_folder(root, "out.zip", None);
        let downloads = &mut h.downloads;
        let abort = async {
            tokio::task::yield_now().await;
            downloads.poll_updates();
            let id = downloads.all()[0].id;
            assert!(downloads.abort(id));
        };
        let (result, ()) = tokio::join!(export, abort);
        assert!(matches!(result, Err(Error::Aborted)));

        h.downloads.poll_updates();
        assert!(h.downloads.all().is_empty());
        assert_eq!(names(&h.workspace), vec!["docs", "top.txt"]);
    }

    #[tokio::test]
    async fn test_extract_directory_fails() {
        let mut h = harness(sample());
        let docs = h.workspace.listing()[0].id;
        let err = h.workspace.extract(docs, "docs").await.unwrap_err();
        assert!(matches!(err, Error::IsADirectory(_)));
        h.downloads.poll_updates();
        assert!(h.downloads.all().is_empty());
    }
}
