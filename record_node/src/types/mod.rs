//! Domain types shared across the record workflow

use serde::{Deserialize, Serialize};

/// A single medical record entry as stored in the ledger's record manager
/// resource. The file itself is never stored here; `content_ref` is the only
/// link to the actual bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Ledger address of the account that created the record
    pub owner_id: String,
    /// Client-generated creation time, ISO-8601. Clients with skewed clocks
    /// give no ordering guarantee across accounts.
    pub timestamp: String,
    /// Free-text symptoms
    pub symptoms: String,
    /// Free-text diagnosis
    pub diagnosis: String,
    /// Content identifier (current format) or legacy raw hash
    pub content_ref: String,
    /// Original upload filename. Not populated by the write path; kept for
    /// forward compatibility with older resource layouts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    /// Record version. Never populated by the write path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Last modification time. Never populated by the write path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    /// Last modifying account. Never populated by the write path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
}

impl Record {
    /// Classification of this record's content reference
    pub fn content_kind(&self) -> ContentRefKind {
        classify(&self.content_ref)
    }
}

/// Classification of a content reference string, derived purely from its
/// prefix. No network check is involved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentRefKind {
    /// CIDv0, base58, starts with `Qm`
    CidV0,
    /// CIDv1, base32, starts with `bafy` or `bafk`
    CidV1,
    /// Anything else; notably the 64-char hex SHA-256 digests produced by an
    /// earlier client that hashed files locally without storing them
    LegacyHash,
}

impl ContentRefKind {
    /// Whether a gateway can ever serve this reference
    pub fn is_fetchable(&self) -> bool {
        !matches!(self, ContentRefKind::LegacyHash)
    }
}

/// Classify a content reference by prefix
pub fn classify(content_ref: &str) -> ContentRefKind {
    if content_ref.starts_with("Qm") {
        ContentRefKind::CidV0
    } else if content_ref.starts_with("bafy") || content_ref.starts_with("bafk") {
        ContentRefKind::CidV1
    } else {
        ContentRefKind::LegacyHash
    }
}

/// The record manager ledger resource: an append-only ordered sequence of
/// records. This is the only resource type this client reads or writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordManager {
    pub records: Vec<Record>,
}

impl RecordManager {
    /// Parse a manager resource out of a raw ledger resource value.
    ///
    /// Resources without a `records` field decode to an empty manager rather
    /// than an error, matching how a freshly initialized manager reads back.
    pub fn from_resource(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.get("records").is_none() {
            return Ok(RecordManager::default());
        }
        serde_json::from_value(value.clone())
    }
}

/// Per-account aggregate shown on the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountStats {
    pub total_records: u64,
    /// Timestamp of the most recent record, if any
    pub last_upload: Option<String>,
}

/// Ledger-wide aggregate shown on the landing page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerStats {
    pub total_records: u64,
    /// Number of distinct owning accounts
    pub total_accounts: u64,
}
