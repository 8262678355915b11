//! Gateway retrieval: resolve a content reference into bytes via an ordered
//! list of public gateways, plus a per-gateway diagnostic probe.

use async_trait::async_trait;
use cid::Cid;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::RetrievalConfig;
use crate::types::{classify, ContentRefKind};

/// SHA2-256 multihash code
const SHA2_256_CODE: u64 = 0x12;

/// Raw codec identifier (0x55), the only codec whose digest covers the
/// fetched bytes directly
const RAW_CODEC: u64 = 0x55;

/// Notice shown for records that predate content-addressed storage. These
/// are a different remediation path than a transient gateway outage, so the
/// wording is explanatory rather than alarming.
pub const LEGACY_EXPLANATION: &str = "This record was created with the old upload system that \
only stored a local content hash, not an actual stored file. It cannot be fetched from any \
gateway. Records uploaded with the current system work normally.";

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("this older record predates content-addressed storage and cannot be fetched")]
    UnsupportedLegacyFormat,
    #[error("all gateways failed for {content_ref}; last attempt {last_gateway}: {last_outcome}")]
    Exhausted {
        content_ref: String,
        last_gateway: String,
        last_outcome: String,
    },
    #[error("bytes served by {gateway} do not match content identifier {content_ref}")]
    IntegrityMismatch {
        content_ref: String,
        gateway: String,
    },
}

/// Transport-level fetch failure (connection refused, timeout, DNS)
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub message: String,
}

/// One gateway GET response
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedBody {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP egress seam. The resolver only ever talks to gateways through this,
/// which keeps the fallback logic drivable by mocks.
#[async_trait]
pub trait GatewayFetcher: Send + Sync {
    /// GET the full body
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchFailure>;
    /// HEAD existence probe, returning the status code
    async fn head(&self, url: &str) -> Result<u16, FetchFailure>;
}

/// reqwest-backed fetcher with a bounded per-attempt timeout
pub struct HttpGatewayFetcher {
    client: Client,
}

impl HttpGatewayFetcher {
    pub fn new(attempt_timeout: Duration) -> Result<Self, FetchFailure> {
        let client = Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| FetchFailure {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GatewayFetcher for HttpGatewayFetcher {
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(|e| FetchFailure {
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(&name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let content_disposition = header(reqwest::header::CONTENT_DISPOSITION);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchFailure {
                message: e.to_string(),
            })?
            .to_vec();

        Ok(FetchedBody {
            status,
            content_type,
            content_disposition,
            bytes,
        })
    }

    async fn head(&self, url: &str) -> Result<u16, FetchFailure> {
        let response = self.client.head(url).send().await.map_err(|e| FetchFailure {
            message: e.to_string(),
        })?;
        Ok(response.status().as_u16())
    }
}

/// Payload resolved from a gateway. The caller owns the bytes and releases
/// them when the record is no longer displayed.
#[derive(Debug, Clone)]
pub struct RetrievedContent {
    pub bytes: Vec<u8>,
    /// Declared content type, `application/octet-stream` when absent
    pub content_type: String,
    /// Gateway that served the bytes
    pub gateway: String,
    /// Filename from the Content-Disposition header, if the gateway sent one
    pub file_name: Option<String>,
}

/// Status of one gateway during a diagnostic probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayProbe {
    pub gateway: String,
    /// HTTP status, `None` when the transport failed
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Full diagnostic report for one content reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeReport {
    pub content_ref: String,
    pub kind: ContentRefKind,
    pub old_format: bool,
    pub explanation: Option<String>,
    /// At least one gateway confirms existence
    pub available: bool,
    pub probes: Vec<GatewayProbe>,
}

/// Resolves content references against a fixed, ordered gateway list.
///
/// Gateways are third-party mirrors with uncorrelated availability; trying
/// them in priority order with full fallback tolerates partial outages
/// without any coordination. The list itself is the whole retry policy.
pub struct RetrievalResolver {
    gateways: Vec<String>,
    fetcher: Arc<dyn GatewayFetcher>,
    verify_integrity: bool,
}

impl RetrievalResolver {
    pub fn new(config: &RetrievalConfig, fetcher: Arc<dyn GatewayFetcher>) -> Self {
        Self {
            gateways: config.gateways.clone(),
            fetcher,
            verify_integrity: config.verify_integrity,
        }
    }

    /// Resolver with the reqwest fetcher and the configured attempt timeout
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, FetchFailure> {
        let fetcher = HttpGatewayFetcher::new(Duration::from_secs(config.attempt_timeout_secs))?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Resolve a content reference into bytes and a MIME type.
    ///
    /// Legacy references fail before any I/O: no network location can ever
    /// satisfy a raw hash that was never stored anywhere retrievable.
    pub async fn resolve(&self, content_ref: &str) -> Result<RetrievedContent, RetrievalError> {
        if !classify(content_ref).is_fetchable() {
            return Err(RetrievalError::UnsupportedLegacyFormat);
        }

        let mut last_gateway = String::new();
        let mut last_outcome = "no gateways configured".to_string();

        for gateway in &self.gateways {
            let url = format!("{gateway}{content_ref}");
            last_gateway = gateway.clone();

            match self.fetcher.get(&url).await {
                Ok(body) if body.is_success() => {
                    debug!("resolved {content_ref} via {gateway}");
                    if self.verify_integrity && !digest_matches(content_ref, &body.bytes) {
                        return Err(RetrievalError::IntegrityMismatch {
                            content_ref: content_ref.to_string(),
                            gateway: gateway.clone(),
                        });
                    }
                    let file_name = body
                        .content_disposition
                        .as_deref()
                        .and_then(filename_from_content_disposition);
                    return Ok(RetrievedContent {
                        content_type: body
                            .content_type
                            .unwrap_or_else(|| "application/octet-stream".to_string()),
                        bytes: body.bytes,
                        gateway: gateway.clone(),
                        file_name,
                    });
                }
                Ok(body) => {
                    debug!("gateway {gateway} returned {} for {content_ref}", body.status);
                    last_outcome = format!("status {}", body.status);
                }
                Err(failure) => {
                    debug!("gateway {gateway} failed for {content_ref}: {}", failure.message);
                    last_outcome = failure.message;
                }
            }
        }

        warn!("all gateways exhausted for {content_ref}");
        Err(RetrievalError::Exhausted {
            content_ref: content_ref.to_string(),
            last_gateway,
            last_outcome,
        })
    }

    /// Probe every gateway for existence of a reference, never
    /// short-circuiting. Purely diagnostic; fetch routing never consults it.
    pub async fn validate(&self, content_ref: &str) -> ProbeReport {
        let kind = classify(content_ref);
        if !kind.is_fetchable() {
            return ProbeReport {
                content_ref: content_ref.to_string(),
                kind,
                old_format: true,
                explanation: Some(LEGACY_EXPLANATION.to_string()),
                available: false,
                probes: Vec::new(),
            };
        }

        let mut probes = Vec::with_capacity(self.gateways.len());
        for gateway in &self.gateways {
            let url = format!("{gateway}{content_ref}");
            let probe = match self.fetcher.head(&url).await {
                Ok(status) => GatewayProbe {
                    gateway: gateway.clone(),
                    status: Some(status),
                    error: None,
                },
                Err(failure) => GatewayProbe {
                    gateway: gateway.clone(),
                    status: None,
                    error: Some(failure.message),
                },
            };
            probes.push(probe);
        }

        let available = probes.iter().any(|p| p.status == Some(200));
        ProbeReport {
            content_ref: content_ref.to_string(),
            kind,
            old_format: false,
            explanation: None,
            available,
            probes,
        }
    }
}

/// Compare fetched bytes against the digest embedded in the reference.
///
/// Only raw-codec CIDs with a SHA2-256 multihash cover the served bytes
/// directly; other codecs hash an encoding this client does not reconstruct,
/// so they pass without comparison.
fn digest_matches(content_ref: &str, bytes: &[u8]) -> bool {
    let cid = match Cid::try_from(content_ref) {
        Ok(cid) => cid,
        // Unparseable as a CID despite the prefix; nothing to compare
        Err(_) => return true,
    };
    if cid.codec() != RAW_CODEC || cid.hash().code() != SHA2_256_CODE {
        return true;
    }
    let digest = Sha256::digest(bytes);
    cid.hash().digest() == digest.as_slice()
}

/// Extract a filename from a Content-Disposition header value
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let marker = "filename=";
    let start = header.find(marker)? + marker.len();
    let rest = &header[start..];
    let value = rest.split(';').next()?.trim();
    let trimmed = value.trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Map a MIME type to a download extension
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => ".pdf",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "text/plain" => ".txt",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/zip" | "application/x-zip-compressed" => ".zip",
        _ => ".bin",
    }
}

/// Pick a download filename: the declared one when present, otherwise a
/// generated name from the reference prefix and MIME type
pub fn suggested_file_name(content: &RetrievedContent, content_ref: &str) -> String {
    if let Some(name) = &content.file_name {
        return name.clone();
    }
    let prefix: String = content_ref.chars().take(8).collect();
    format!(
        "medical_record_{prefix}{}",
        extension_for_mime(&content.content_type)
    )
}
