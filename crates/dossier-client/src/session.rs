//! The editing session: sole owner of a [`Document`].
//!
//! Every edit goes through a `Session` method, which applies it to the
//! document synchronously, hands a fresh snapshot to autosave, and dispatches
//! side effects (deleting orphaned images, raising notices). Uploads run in
//! the background; their results come back over a channel and are applied by
//! [`Session::pump`] or [`Session::settle`], never concurrently with an edit.
//!
//! Dropping the session fires one last detached flush and aborts whatever is
//! still tracked.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dossier_doc::{
    BlockField, DocError, Direction, Document, FieldUpdate, SideField, TableEdit,
};
use dossier_types::{BlockId, BlockKind, ExternalItemId, ImageData, LocalImage, SectionId, SideItemId, StorageKey};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::assets::AssetCoordinator;
use crate::autosave::{AutosaveHandle, FlushOutcome, Flusher, spawn_autosave};
use crate::backend::{BackendError, Backends};
use crate::config::ClientConfig;
use crate::inflight::InFlight;
use crate::mapper::{self, HydrateError};
use crate::notice::{Notice, NoticeBus, NoticeSubscription};
use crate::scroll_lock::ScrollLock;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to load report: {0}")]
    Hydrate(#[from] HydrateError),
    /// Explicit save refused: no text block has a body.
    #[error("report has no text content")]
    TextContentRequired,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Result of one background upload.
struct UploadDone {
    block: BlockId,
    ticket: u64,
    result: std::result::Result<StorageKey, BackendError>,
}

/// An upload the session is waiting on.
struct PendingUpload {
    ticket: u64,
    /// Image reference before the file was selected, restored on failure.
    prior: ImageData,
}

pub struct Session {
    doc: Document,
    assets: AssetCoordinator,
    flusher: Flusher,
    autosave: AutosaveHandle,
    notices: NoticeBus,
    scroll: ScrollLock,
    inflight: InFlight,
    uploads: HashMap<BlockId, PendingUpload>,
    next_ticket: u64,
    done_tx: mpsc::UnboundedSender<UploadDone>,
    done_rx: mpsc::UnboundedReceiver<UploadDone>,
    runtime: Handle,
    exited: bool,
}

impl Session {
    /// Start a session on a fresh document. Must be called within a runtime.
    pub fn create(item: ExternalItemId, backends: Backends, config: &ClientConfig) -> Self {
        Self::with_document(Document::new(item), backends, config)
    }

    /// Load `item` from the backend, or start fresh if no report exists yet.
    pub async fn open(item: ExternalItemId, backends: Backends, config: &ClientConfig) -> Result<Self> {
        let token = backends.token()?;
        let notices = NoticeBus::default();
        let assets = AssetCoordinator::new(backends.clone(), config.allowed_image_types.clone(), notices.clone());

        let doc = match backends.reports.load(&token, &item).await? {
            Some(wire) => mapper::from_wire(&wire, &assets).await?,
            None => {
                info!(document = %item, "no saved report, starting fresh");
                Document::new(item)
            }
        };
        Ok(Self::assemble(doc, backends, config, notices, assets))
    }

    /// Start a session on an existing document. Must be called within a runtime.
    pub fn with_document(doc: Document, backends: Backends, config: &ClientConfig) -> Self {
        let notices = NoticeBus::default();
        let assets = AssetCoordinator::new(backends.clone(), config.allowed_image_types.clone(), notices.clone());
        Self::assemble(doc, backends, config, notices, assets)
    }

    fn assemble(
        doc: Document,
        backends: Backends,
        config: &ClientConfig,
        notices: NoticeBus,
        assets: AssetCoordinator,
    ) -> Self {
        let runtime = Handle::current();
        let flusher = Flusher::new(backends.reports.clone(), backends.credentials.clone());
        let autosave = spawn_autosave(flusher.clone(), config.quiet_window());
        autosave.seed(mapper::to_wire(&doc));
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            doc,
            assets,
            flusher,
            autosave,
            notices,
            scroll: ScrollLock::new(),
            inflight: InFlight::new(runtime.clone()),
            uploads: HashMap::new(),
            next_ticket: 0,
            done_tx,
            done_rx,
            runtime,
            exited: false,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    pub fn subscribe(&self, prefix: &str) -> NoticeSubscription {
        self.notices.subscribe(prefix)
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll
    }

    /// Number of uploads not yet applied.
    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }

    // =========================================================================
    // Change plumbing
    // =========================================================================

    fn touched(&mut self) {
        self.autosave.changed(mapper::to_wire(&self.doc));
    }

    fn delete_keys(&mut self, keys: Vec<StorageKey>) {
        for key in keys {
            self.assets.delete_image(key, &mut self.inflight);
        }
    }

    // =========================================================================
    // Header
    // =========================================================================

    pub fn set_title(&mut self, title: &str) {
        self.doc.header.title = title.to_string();
        self.touched();
    }

    pub fn set_version_label(&mut self, label: &str) {
        self.doc.header.version_label = label.to_string();
        self.touched();
    }

    pub fn set_code(&mut self, code: &str) {
        self.doc.header.code = code.to_string();
        self.touched();
    }

    pub fn set_created_date(&mut self, date: NaiveDate) {
        self.doc.header.created_date = date;
        self.touched();
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn add_section(&mut self) -> SectionId {
        let id = self.doc.add_section();
        self.touched();
        id
    }

    /// Remove a section and delete every image it held.
    pub fn remove_section(&mut self, id: SectionId) -> Result<()> {
        let removal = self.doc.remove_section(id)?;
        self.delete_keys(removal.orphaned_keys);
        self.touched();
        Ok(())
    }

    pub fn add_block(&mut self, section: SectionId, kind: BlockKind) -> Result<BlockId> {
        let id = self.doc.add_block(section, kind)?;
        self.touched();
        Ok(id)
    }

    pub fn remove_block(&mut self, section: SectionId, block: BlockId) -> Result<()> {
        let removal = self.doc.remove_block(section, block)?;
        self.delete_keys(removal.orphaned_keys);
        self.touched();
        Ok(())
    }

    /// Returns whether the block moved.
    pub fn move_block(&mut self, section: SectionId, block: BlockId, direction: Direction) -> Result<bool> {
        let moved = self.doc.move_block(section, block, direction)?;
        if moved {
            self.touched();
        }
        Ok(moved)
    }

    // =========================================================================
    // Content
    // =========================================================================

    pub fn update_block_field(&mut self, block: BlockId, field: BlockField, value: &str) -> Result<FieldUpdate> {
        let update = self.doc.update_block_field(block, field, value)?;
        if let Some(t) = update.truncated {
            self.notices.publish(Notice::FieldTruncated {
                block,
                field: t.field,
                max: t.max,
            });
        }
        self.touched();
        Ok(update)
    }

    pub fn set_image_size(&mut self, block: BlockId, width: u32, height: u32) -> Result<()> {
        self.doc.set_image_size(block, width, height)?;
        self.touched();
        Ok(())
    }

    pub fn edit_table(&mut self, block: BlockId, edit: TableEdit) -> Result<()> {
        self.doc.edit_table(block, edit)?;
        self.touched();
        Ok(())
    }

    pub fn add_side_item(&mut self, section: SectionId) -> Result<SideItemId> {
        let id = self.doc.add_side_item(section)?;
        self.touched();
        Ok(id)
    }

    pub fn update_side_item(&mut self, section: SectionId, item: SideItemId, field: SideField, value: &str) -> Result<()> {
        self.doc.update_side_item(section, item, field, value)?;
        self.touched();
        Ok(())
    }

    pub fn remove_side_item(&mut self, section: SectionId, item: SideItemId) -> Result<()> {
        self.doc.remove_side_item(section, item)?;
        self.touched();
        Ok(())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Attach a file to an image block and start uploading it.
    ///
    /// Returns `false` if the file type is not allowed; the block is left
    /// untouched and an [`Notice::ImageRejected`] is raised.
    pub fn select_image(&mut self, block: BlockId, file: LocalImage) -> Result<bool> {
        // Kind check first, so a rejected call on a text block is an error.
        let prior = self.doc.with_image_mut(block, |img| img.clone())?;
        if !self.assets.accept(block, &file) {
            return Ok(false);
        }

        let file = Arc::new(file);
        let preview = AssetCoordinator::preview_url(&file);
        self.doc.with_image_mut(block, |img| {
            img.display_url = Some(preview);
            img.local_file = Some(file.clone());
        })?;

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        // A newer selection supersedes an older one; keep the oldest prior
        // so a failure restores what was there before either.
        let prior = match self.uploads.remove(&block) {
            Some(older) => older.prior,
            None => prior,
        };
        self.uploads.insert(block, PendingUpload { ticket, prior });

        let assets = self.assets.clone();
        let tx = self.done_tx.clone();
        self.inflight.spawn(async move {
            let result = assets.upload(&file).await;
            let _ = tx.send(UploadDone { block, ticket, result });
        });
        debug!(block = %block, ticket, "upload started");

        self.touched();
        Ok(true)
    }

    /// Apply every upload result that has arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.done_rx.try_recv() {
            self.apply_upload(done);
            applied += 1;
        }
        applied
    }

    /// Wait until every pending upload has been applied.
    pub async fn settle(&mut self) {
        while !self.uploads.is_empty() {
            match self.done_rx.recv().await {
                Some(done) => self.apply_upload(done),
                None => break,
            }
        }
        self.pump();
    }

    fn apply_upload(&mut self, done: UploadDone) {
        let UploadDone { block, ticket, result } = done;

        let current = self.uploads.get(&block).is_some_and(|p| p.ticket == ticket);
        if !current {
            // Superseded by a newer selection.
            if let Ok(key) = result {
                debug!(block = %block, key = %key, "discarding superseded upload");
                self.assets.delete_image(key, &mut self.inflight);
            }
            return;
        }
        let Some(pending) = self.uploads.remove(&block) else {
            return;
        };

        if self.doc.block(block).is_none() {
            if let Ok(key) = result {
                debug!(block = %block, key = %key, "block removed during upload, deleting orphan");
                self.assets.delete_image(key, &mut self.inflight);
            }
            return;
        }

        match result {
            Ok(key) => {
                let replaced = self
                    .doc
                    .with_image_mut(block, |img| {
                        img.local_file = None;
                        img.storage_key.replace(key.clone())
                    })
                    .ok()
                    .flatten();
                if let Some(old) = replaced.filter(|old| *old != key && !old.is_empty()) {
                    self.assets.delete_image(old, &mut self.inflight);
                }
                info!(block = %block, key = %key, "image uploaded");
            }
            Err(e) => {
                warn!(block = %block, error = %e, "image upload failed, restoring");
                // Only the reference rolls back; a resize made meanwhile stays.
                let prior = pending.prior;
                let _ = self.doc.with_image_mut(block, |img| {
                    img.storage_key = prior.storage_key;
                    img.display_url = prior.display_url;
                    img.local_file = prior.local_file;
                });
                self.notices.publish(Notice::UploadFailed {
                    block,
                    reason: e.to_string(),
                });
            }
        }
        self.touched();
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Explicit save: requires some text content, then flushes immediately.
    pub async fn save(&mut self) -> Result<FlushOutcome> {
        if !self.doc.has_text_content() {
            self.notices.publish(Notice::TextContentRequired);
            return Err(SessionError::TextContentRequired);
        }
        Ok(self.flush_now().await)
    }

    /// Flush the current state now, bypassing the quiet window.
    pub async fn flush_now(&self) -> FlushOutcome {
        self.autosave.flush_now().await
    }

    /// The editor went out of view: fire a detached flush of the current
    /// state. The session stays usable and autosave keeps running.
    pub fn page_hidden(&self) {
        self.flusher
            .spawn_detached(&self.runtime, mapper::to_wire(&self.doc));
    }

    /// Leave the editor: fire a detached final flush, then tear down.
    pub fn exit(mut self) {
        self.fire_exit_flush();
    }

    fn fire_exit_flush(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        self.flusher
            .spawn_detached(&self.runtime, mapper::to_wire(&self.doc));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.fire_exit_flush();
        self.inflight.abort_all();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("document", self.doc.external_item_id())
            .field("pending_uploads", &self.uploads.len())
            .finish_non_exhaustive()
    }
}
