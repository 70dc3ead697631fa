//! Download tracking for exports and extractions
//!
//! Pipelines get a [`DownloadSink`] and open one [`DownloadHandle`] per
//! transfer. The UI side owns [`Downloads`], polls it for updates and can
//! abort a transfer while the pipeline is suspended on store I/O.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::error::{Error, Result};

pub type DownloadId = u64;

/// Failed and aborted downloads are released from the list, so a record is
/// either still running or holds output waiting to be taken
#[derive(Clone, Debug, PartialEq)]
pub enum DownloadStatus {
    Running,
    Complete,
}

#[derive(Debug)]
pub struct Download {
    pub id: DownloadId,
    pub name: String,
    pub mime_type: String,
    pub progress_value: u64,
    pub progress_max: u64,
    pub status: DownloadStatus,
    pub created_at: Instant,
    pub completed_at: Option<Instant>,
    output: Option<Vec<u8>>,
    abort: Arc<AtomicBool>,
}

impl Download {
    pub fn is_active(&self) -> bool {
        matches!(self.status, DownloadStatus::Running)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, DownloadStatus::Complete)
    }

    /// Progress ratio for display, `None` until the size is known
    pub fn progress(&self) -> Option<f32> {
        (self.progress_max > 0).then(|| self.progress_value as f32 / self.progress_max as f32)
    }
}

/// Messages from pipelines to the download list
#[derive(Debug)]
pub enum DownloadUpdate {
    Started {
        id: DownloadId,
        name: String,
        mime_type: String,
        abort: Arc<AtomicBool>,
    },
    Progress(DownloadId, u64, u64),
    Complete(DownloadId, Vec<u8>),
    Failed(DownloadId, String),
    Aborted(DownloadId),
}

/// Producer side, cloned into the workspace
#[derive(Clone, Debug)]
pub struct DownloadSink {
    tx: mpsc::UnboundedSender<DownloadUpdate>,
    next_id: Arc<AtomicU64>,
}

impl DownloadSink {
    pub fn begin(&self, name: &str) -> DownloadHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mime_type = mime_guess::from_path(name)
            .first_or_octet_stream()
            .to_string();
        let abort = Arc::new(AtomicBool::new(false));
        let _ = self.tx.send(DownloadUpdate::Started {
            id,
            name: name.to_string(),
            mime_type,
            abort: abort.clone(),
        });
        tracing::debug!(id, name, "download started");
        DownloadHandle {
            id,
            name: name.to_string(),
            tx: self.tx.clone(),
            abort,
            finished: false,
        }
    }
}

/// One in-flight transfer. Dropping an unfinished handle releases it as aborted.
#[derive(Debug)]
pub struct DownloadHandle {
    id: DownloadId,
    name: String,
    tx: mpsc::UnboundedSender<DownloadUpdate>,
    abort: Arc<AtomicBool>,
    finished: bool,
}

impl DownloadHandle {
    pub fn id(&self) -> DownloadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progress(&self, value: u64, max: u64) {
        let _ = self.tx.send(DownloadUpdate::Progress(self.id, value, max));
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub fn check_aborted(&self) -> Result<()> {
        if self.is_aborted() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }

    /// Hands the outcome to the sink and releases the download
    pub fn complete_or_abort(mut self, result: Result<Vec<u8>>) -> Result<()> {
        self.finished = true;
        let aborted = self.is_aborted();
        match result {
            Ok(bytes) if !aborted => {
                tracing::debug!(id = self.id, size = bytes.len(), "download complete");
                let _ = self.tx.send(DownloadUpdate::Complete(self.id, bytes));
                Ok(())
            }
            Ok(_) | Err(Error::Aborted) => {
                tracing::debug!(id = self.id, "download aborted");
                let _ = self.tx.send(DownloadUpdate::Aborted(self.id));
                Err(Error::Aborted)
            }
            Err(e) => {
                tracing::debug!(id = self.id, error = %e, "download failed");
                let _ = self.tx.send(DownloadUpdate::Failed(self.id, e.to_string()));
                Err(e)
            }
        }
    }
}

impl Drop for DownloadHandle {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.tx.send(DownloadUpdate::Aborted(self.id));
        }
    }
}

/// The download list shown to the user
pub struct Downloads {
    downloads: Vec<Download>,
    update_rx: mpsc::UnboundedReceiver<DownloadUpdate>,
    sink: DownloadSink,
}

impl Downloads {
    pub fn new() -> Self {
        let (tx, update_rx) = mpsc::unbounded_channel();
        Self {
            downloads: Vec::new(),
            update_rx,
            sink: DownloadSink {
                tx,
                next_id: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    pub fn sink(&self) -> DownloadSink {
        self.sink.clone()
    }

    pub fn get(&self, id: DownloadId) -> Option<&Download> {
        self.downloads.iter().find(|d| d.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Download> {
        self.downloads.iter().filter(|d| d.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn all(&self) -> &[Download] {
        &self.downloads
    }

    /// Request cancellation; the pipeline stops at its next entry boundary
    pub fn abort(&mut self, id: DownloadId) -> bool {
        match self.downloads.iter().find(|d| d.id == id && d.is_active()) {
            Some(download) => {
                download.abort.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Non-blocking poll for updates
    pub fn poll_updates(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            self.apply_update(update);
        }
    }

    fn apply_update(&mut self, update: DownloadUpdate) {
        match update {
            DownloadUpdate::Started {
                id,
                name,
                mime_type,
                abort,
            } => {
                self.downloads.push(Download {
                    id,
                    name,
                    mime_type,
                    progress_value: 0,
                    progress_max: 0,
                    status: DownloadStatus::Running,
                    created_at: Instant::now(),
                    completed_at: None,
                    output: None,
                    abort,
                });
            }
            DownloadUpdate::Progress(id, value, max) => {
                if let Some(download) = self.find_mut(id) {
                    download.progress_value = value;
                    download.progress_max = max;
                }
            }
            DownloadUpdate::Complete(id, bytes) => {
                if let Some(download) = self.find_mut(id) {
                    download.status = DownloadStatus::Complete;
                    download.progress_value = download.progress_max;
                    download.output = Some(bytes);
                    download.completed_at = Some(Instant::now());
                }
            }
            DownloadUpdate::Failed(id, msg) => {
                if let Some(download) = self.release(id) {
                    tracing::info!(id, name = %download.name, error = %msg, "download failed");
                }
            }
            DownloadUpdate::Aborted(id) => {
                if let Some(download) = self.release(id) {
                    tracing::info!(id, name = %download.name, "download aborted");
                }
            }
        }
    }

    fn find_mut(&mut self, id: DownloadId) -> Option<&mut Download> {
        self.downloads.iter_mut().find(|d| d.id == id)
    }

    // Only running downloads are released; a late abort after completion
    // keeps the output.
    fn release(&mut self, id: DownloadId) -> Option<Download> {
        let pos = self
            .downloads
            .iter()
            .position(|d| d.id == id && d.is_active())?;
        Some(self.downloads.remove(pos))
    }

    /// Take the bytes of a completed download, removing it from the list
    pub fn take_output(&mut self, id: DownloadId) -> Option<Vec<u8>> {
        let pos = self
            .downloads
            .iter()
            .position(|d| d.id == id && d.is_complete())?;
        self.downloads.remove(pos).output
    }
}

impl Default for Downloads {
    fn default() -> Self {
        Self::new()
    }
}
