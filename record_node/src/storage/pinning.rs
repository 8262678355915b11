//! HTTP client for the upload gateway service

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{ContentStore, ContentStoreError, StoredContent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    content_id: String,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: Option<String>,
}

/// Client for the multipart upload endpoint of the pinning gateway
pub struct PinningClient {
    client: Client,
    upload_url: String,
}

impl PinningClient {
    pub fn new(upload_url: String) -> Result<Self, ContentStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ContentStoreError::Unreachable {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, upload_url })
    }
}

#[async_trait]
impl ContentStore for PinningClient {
    async fn store(&self, bytes: &[u8], file_name: &str) -> Result<StoredContent, ContentStoreError> {
        debug!("storing {} bytes as {file_name}", bytes.len());

        let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ContentStoreError::Unreachable {
                message: format!("cannot reach {}: {e}", self.upload_url),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UploadErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| status.to_string());
            return Err(ContentStoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse =
            response
                .json()
                .await
                .map_err(|e| ContentStoreError::Rejected {
                    status: status.as_u16(),
                    message: format!("malformed store response: {e}"),
                })?;

        info!("stored content {} ({})", parsed.content_id, parsed.file_name);
        Ok(StoredContent {
            content_id: parsed.content_id,
            file_name: parsed.file_name,
        })
    }
}
