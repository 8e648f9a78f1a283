//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dossier_client::{BackendError, Backends, ClientConfig, ImageStore, ReportStore, TokenCell};
use dossier_types::{ExternalItemId, LocalImage, StorageKey, WireDocument};
use parking_lot::Mutex;

#[derive(Default)]
pub struct FakeBackend {
    pub saves: Mutex<Vec<WireDocument>>,
    pub deletes: Mutex<Vec<StorageKey>>,
    pub uploads: Mutex<Vec<String>>,
    pub stored: Mutex<Option<WireDocument>>,
    pub unresolvable: Mutex<HashSet<String>>,
    pub fail_saves: AtomicBool,
    pub fail_uploads: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// Time a save spends on the wire before it lands.
    pub save_latency: Mutex<Option<Duration>>,
    next_key: AtomicU64,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saves(&self) -> Vec<WireDocument> {
        self.saves.lock().clone()
    }

    /// Last document that landed.
    pub fn stored(&self) -> Option<WireDocument> {
        self.stored.lock().clone()
    }

    pub fn deletes(&self) -> Vec<StorageKey> {
        self.deletes.lock().clone()
    }
}

#[async_trait]
impl ReportStore for FakeBackend {
    async fn save(&self, _token: &str, doc: &WireDocument) -> Result<(), BackendError> {
        let latency = *self.save_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.saves.lock().push(doc.clone());
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        *self.stored.lock() = Some(doc.clone());
        Ok(())
    }

    async fn load(&self, _token: &str, item: &ExternalItemId) -> Result<Option<WireDocument>, BackendError> {
        Ok(self
            .stored
            .lock()
            .clone()
            .filter(|doc| &doc.external_item_id == item))
    }
}

#[async_trait]
impl ImageStore for FakeBackend {
    async fn upload(&self, _token: &str, file: &LocalImage) -> Result<StorageKey, BackendError> {
        self.uploads.lock().push(file.file_name.clone());
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection reset".into()));
        }
        let n = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StorageKey::new(format!("key-{n}")))
    }

    async fn proxy_url(&self, _token: &str, key: &StorageKey) -> Result<String, BackendError> {
        if self.unresolvable.lock().contains(key.as_str()) {
            return Err(BackendError::Status {
                status: 404,
                body: "gone".into(),
            });
        }
        Ok(format!("data:image/jpeg;base64,{}", key.as_str()))
    }

    async fn delete(&self, _token: &str, key: &StorageKey) -> Result<(), BackendError> {
        self.deletes.lock().push(key.clone());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("timeout".into()));
        }
        Ok(())
    }
}

pub fn backends(fake: &Arc<FakeBackend>) -> Backends {
    Backends::new(fake.clone(), fake.clone(), Arc::new(TokenCell::new(Some("tok".into()))))
}

pub fn anonymous(fake: &Arc<FakeBackend>) -> Backends {
    Backends::new(fake.clone(), fake.clone(), Arc::new(TokenCell::new(None)))
}

pub fn config() -> ClientConfig {
    ClientConfig::default()
}

pub fn jpeg(name: &str) -> LocalImage {
    LocalImage::new(name, "image/jpeg", vec![0xff, 0xd8, 0xff])
}

/// Let spawned background tasks run.
pub async fn settle_tasks() {
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
}
