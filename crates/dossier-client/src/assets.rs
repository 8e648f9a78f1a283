//! Image asset lifecycle: validate, preview, upload, resolve, delete.
//!
//! The coordinator is stateless apart from its collaborators; bookkeeping for
//! uploads in progress lives in the session, which owns the document.

use std::sync::Arc;

use dossier_types::{BlockId, LocalImage, StorageKey};
use tracing::{debug, warn};

use crate::backend::{BackendError, Backends, ImageStore};
use crate::http::data_url;
use crate::inflight::InFlight;
use crate::notice::{Notice, NoticeBus};

#[derive(Clone)]
pub struct AssetCoordinator {
    backends: Backends,
    allowed_types: Arc<[String]>,
    notices: NoticeBus,
}

impl AssetCoordinator {
    pub fn new(backends: Backends, allowed_types: Vec<String>, notices: NoticeBus) -> Self {
        Self {
            backends,
            allowed_types: allowed_types.into(),
            notices,
        }
    }

    fn images(&self) -> &Arc<dyn ImageStore> {
        &self.backends.images
    }

    /// Check the file's MIME type, raising a notice on rejection.
    pub fn accept(&self, block: BlockId, file: &LocalImage) -> bool {
        let ok = self
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(file.mime.trim()));
        if !ok {
            debug!(block = %block, mime = %file.mime, "image rejected");
            self.notices.publish(Notice::ImageRejected {
                block,
                mime: file.mime.clone(),
            });
        }
        ok
    }

    /// Local preview shown until the upload lands.
    pub fn preview_url(file: &LocalImage) -> String {
        data_url(&file.mime, &file.bytes)
    }

    pub async fn upload(&self, file: &LocalImage) -> Result<StorageKey, BackendError> {
        let token = self.backends.token()?;
        self.images().upload(&token, file).await
    }

    /// Exchange a storage key for an embeddable URL.
    pub async fn resolve_for_display(&self, key: &StorageKey) -> Result<String, BackendError> {
        let token = self.backends.token()?;
        self.images().proxy_url(&token, key).await
    }

    /// Best-effort delete. Failures are logged, never surfaced.
    pub async fn delete_now(&self, key: &StorageKey) {
        let token = match self.backends.token() {
            Ok(t) => t,
            Err(_) => {
                warn!(key = %key, "no credential, image left in storage");
                return;
            }
        };
        match self.images().delete(&token, key).await {
            Ok(()) => debug!(key = %key, "image deleted"),
            Err(e) => warn!(key = %key, error = %e, "image delete failed"),
        }
    }

    /// Fire-and-forget [`delete_now`](Self::delete_now), tracked in `inflight`.
    pub fn delete_image(&self, key: StorageKey, inflight: &mut InFlight) {
        let this = self.clone();
        inflight.spawn(async move { this.delete_now(&key).await });
    }
}

impl std::fmt::Debug for AssetCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCoordinator")
            .field("allowed_types", &self.allowed_types)
            .finish_non_exhaustive()
    }
}
