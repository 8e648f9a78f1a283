//! Persistence client for dossier reports.
//!
//! Wraps a [`Document`](dossier_doc::Document) in an editing [`Session`] that
//! keeps the backend eventually consistent without an explicit save:
//!
//! - [`autosave`]: debounced flush actor plus the detached exit flush
//! - [`assets`]: image validation, upload, proxy resolution, deletion
//! - [`mapper`]: `Document` ⇄ [`WireDocument`](dossier_types::WireDocument)
//! - [`http`]: reqwest implementation of [`ReportStore`] and [`ImageStore`]
//!
//! Recoverable problems are published on the session's [`NoticeBus`] instead
//! of being returned as errors.

pub mod assets;
pub mod autosave;
pub mod backend;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod http;
pub mod inflight;
pub mod mapper;
pub mod notice;
pub mod scroll_lock;
pub mod session;

pub use assets::AssetCoordinator;
pub use autosave::{AutosaveHandle, FlushOutcome, Flusher, spawn_autosave};
pub use backend::{BackendError, Backends, ImageStore, ReportStore};
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialSource, TokenCell};
pub use http::HttpBackend;
pub use inflight::InFlight;
pub use mapper::{HydrateError, ItemError, SectionError, from_wire, hydrate, to_wire};
pub use notice::{Notice, NoticeBus, NoticeMessage, NoticeSubscription};
pub use scroll_lock::{ScrollGuard, ScrollLock};
pub use session::{Session, SessionError};

use std::sync::Arc;

/// Backends for the HTTP API described by `config`.
pub fn http_backends(config: &ClientConfig, credentials: Arc<dyn CredentialSource>) -> Result<Backends, BackendError> {
    let http = Arc::new(HttpBackend::new(config)?);
    Ok(Backends::new(http.clone(), http, credentials))
}
