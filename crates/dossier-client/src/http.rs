//! reqwest implementation of the backend traits.
//!
//! | Operation | Request                                   | Response              |
//! |-----------|-------------------------------------------|-----------------------|
//! | save      | `POST planeacion/pdf` (JSON document)     | status only           |
//! | load      | `GET planeacion/pdf/{externalItemId}`     | `{status, data?}`     |
//! | upload    | `POST upload/planeacion/pdf` (multipart)  | `{status, key}`       |
//! | proxy     | `POST proxy/proxy` `{url}`                | image bytes           |
//! | delete    | `POST upload/delete-image` `{key}`        | status only           |
//!
//! Every request carries `Authorization: Bearer <token>` and the configured
//! timeout.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dossier_types::{ExternalItemId, LocalImage, StorageKey, WireDocument};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;

use crate::backend::{BackendError, ImageStore, ReportStore};
use crate::config::ClientConfig;
use crate::constants::{DELETE_IMAGE_PATH, FALLBACK_IMAGE_MIME, PROXY_PATH, REPORT_PATH, UPLOAD_PATH};

#[derive(Deserialize)]
struct LoadResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    data: Option<WireDocument>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    key: Option<String>,
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

/// Build a `data:` URL from raw bytes.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// HTTP client for the report API. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let base = Url::parse(&config.normalized_base_url())
            .map_err(|e| BackendError::Transport(format!("invalid base url: {e}")))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(transport)?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    fn auth_headers(&self, token: &str) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| BackendError::Transport(format!("invalid auth header: {e}")))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Turn a non-success status into an error, keeping the body for the log.
    async fn check(resp: Response) -> Result<Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn post_json(&self, token: &str, path: &str, body: &serde_json::Value) -> Result<Response, BackendError> {
        let resp = self
            .client
            .post(self.endpoint(path)?)
            .headers(self.auth_headers(token)?)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await
    }
}

#[async_trait]
impl ReportStore for HttpBackend {
    async fn save(&self, token: &str, doc: &WireDocument) -> Result<(), BackendError> {
        let resp = self
            .client
            .post(self.endpoint(REPORT_PATH)?)
            .headers(self.auth_headers(token)?)
            .json(doc)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn load(&self, token: &str, item: &ExternalItemId) -> Result<Option<WireDocument>, BackendError> {
        let path = format!("{REPORT_PATH}/{}", item.as_str());
        let resp = self
            .client
            .get(self.endpoint(&path)?)
            .headers(self.auth_headers(token)?)
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: LoadResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(body.data.filter(|_| body.status))
    }
}

#[async_trait]
impl ImageStore for HttpBackend {
    async fn upload(&self, token: &str, file: &LocalImage) -> Result<StorageKey, BackendError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)
            .map_err(transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.endpoint(UPLOAD_PATH)?)
            .headers(self.auth_headers(token)?)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let body: UploadResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        match body.key.filter(|k| !k.is_empty()) {
            Some(key) if body.status => Ok(StorageKey::new(key)),
            _ => Err(BackendError::Rejected("upload returned no key".to_string())),
        }
    }

    async fn proxy_url(&self, token: &str, key: &StorageKey) -> Result<String, BackendError> {
        let resp = self
            .post_json(token, PROXY_PATH, &json!({ "url": key.as_str() }))
            .await?;
        let mime = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| FALLBACK_IMAGE_MIME.to_string());
        let bytes = resp.bytes().await.map_err(transport)?;
        Ok(data_url(&mime, &bytes))
    }

    async fn delete(&self, token: &str, key: &StorageKey) -> Result<(), BackendError> {
        self.post_json(token, DELETE_IMAGE_PATH, &json!({ "key": key.as_str() }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_join_under_base() {
        let config = ClientConfig {
            api_base_url: "https://example.test/api".into(),
            ..ClientConfig::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(
            backend.endpoint(UPLOAD_PATH).unwrap().as_str(),
            "https://example.test/api/upload/planeacion/pdf"
        );
        assert_eq!(
            backend.endpoint(&format!("{REPORT_PATH}/42")).unwrap().as_str(),
            "https://example.test/api/planeacion/pdf/42"
        );
    }

    #[test]
    fn test_bearer_header() {
        let backend = HttpBackend::new(&ClientConfig::default()).unwrap();
        let headers = backend.auth_headers("tok").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig {
            api_base_url: "not a url".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(HttpBackend::new(&config), Err(BackendError::Transport(_))));
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("image/jpeg", &[0xff, 0xd8]), "data:image/jpeg;base64,/9g=");
    }

    #[test]
    fn test_load_response_false_status() {
        let body: LoadResponse = serde_json::from_str(r#"{"status": false}"#).unwrap();
        assert!(body.data.filter(|_| body.status).is_none());
    }
}
