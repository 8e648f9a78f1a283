//! Client configuration constants.
//!
//! Defaults for [`ClientConfig`](crate::ClientConfig) and the backend routes.

use std::time::Duration;

/// Default API root. Routes below are joined onto it.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api/";

/// Quiet period after the last edit before an autosave flush.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(2000);

/// Per-request timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Still-image MIME types accepted for upload.
pub const DEFAULT_ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg"];

/// MIME type assumed for proxied bytes when the response has none.
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Capacity of the notice broadcast channel.
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

// ── Routes ──────────────────────────────────────────────────────────────────

/// Save (POST) and load (GET, with `/{externalItemId}`).
pub const REPORT_PATH: &str = "planeacion/pdf";
pub const UPLOAD_PATH: &str = "upload/planeacion/pdf";
pub const PROXY_PATH: &str = "proxy/proxy";
pub const DELETE_IMAGE_PATH: &str = "upload/delete-image";

// ── Environment ─────────────────────────────────────────────────────────────

pub const ENV_API_URL: &str = "DOSSIER_API_URL";
pub const ENV_TOKEN: &str = "DOSSIER_TOKEN";
