//! Content-addressed storage: the pinning ingress and the gateway egress

pub mod pinning;
pub mod retrieval;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pinning::PinningClient;
pub use retrieval::{GatewayFetcher, RetrievalError, RetrievalResolver};

/// Content store failures, subtyped so the UI can tell "can't reach the
/// store" apart from "the store rejected the upload"
#[derive(Debug, Clone, Error)]
pub enum ContentStoreError {
    #[error("content store unreachable: {message}")]
    Unreachable { message: String },
    #[error("content store rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Successful store result: the content identifier plus the echoed filename
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredContent {
    pub content_id: String,
    pub file_name: String,
}

/// A pinning gateway that accepts raw bytes and returns a content identifier
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn store(&self, bytes: &[u8], file_name: &str) -> Result<StoredContent, ContentStoreError>;
}
