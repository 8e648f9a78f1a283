//! Persistence boundary.
//!
//! Two async traits: [`ReportStore`] for whole-document save/load, and
//! [`ImageStore`] for the asset lifecycle. [`HttpBackend`](crate::HttpBackend)
//! implements both; tests plug in in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use dossier_types::{ExternalItemId, LocalImage, StorageKey, WireDocument};

use crate::credentials::CredentialSource;

/// Errors from a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No bearer token is available.
    #[error("not authenticated")]
    Unauthenticated,
    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The server answered but reported failure in its body.
    #[error("rejected by server: {0}")]
    Rejected(String),
    /// Connection, timeout, or request construction failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Full-state replace keyed by the document's external item id.
    async fn save(&self, token: &str, doc: &WireDocument) -> Result<(), BackendError>;

    /// `Ok(None)` when no report exists yet for `item`.
    async fn load(&self, token: &str, item: &ExternalItemId) -> Result<Option<WireDocument>, BackendError>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, token: &str, file: &LocalImage) -> Result<StorageKey, BackendError>;

    /// Exchange a storage key for a URL the renderer can embed.
    async fn proxy_url(&self, token: &str, key: &StorageKey) -> Result<String, BackendError>;

    async fn delete(&self, token: &str, key: &StorageKey) -> Result<(), BackendError>;
}

/// Everything a session talks to.
#[derive(Clone)]
pub struct Backends {
    pub reports: Arc<dyn ReportStore>,
    pub images: Arc<dyn ImageStore>,
    pub credentials: Arc<dyn CredentialSource>,
}

impl Backends {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        images: Arc<dyn ImageStore>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            reports,
            images,
            credentials,
        }
    }

    pub(crate) fn token(&self) -> Result<String, BackendError> {
        self.credentials.token().ok_or(BackendError::Unauthenticated)
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("authenticated", &self.credentials.token().is_some())
            .finish_non_exhaustive()
    }
}
