//! Ledger read/submit interface consumed by the record workflow

pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use rest::RestLedgerClient;

/// Errors surfaced by ledger operations. `ResourceNotFound` is distinct so
/// callers can treat a missing record manager as "initialize first" rather
/// than a hard failure.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("ledger unreachable: {0}")]
    Transport(String),
    #[error("submission rejected: {0}")]
    Submission(String),
    #[error("finality wait failed: {0}")]
    Finality(String),
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// An entry-function call ready for signing and submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryCall {
    /// Address of the signing account
    pub sender: String,
    /// Fully qualified function id, `address::module::function`
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
}

impl EntryCall {
    pub fn new(sender: &str, function: &str, arguments: Vec<serde_json::Value>) -> Self {
        Self {
            sender: sender.to_string(),
            function: function.to_string(),
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

/// Handle returned when a signed call is accepted by the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedCall {
    /// Network identifier used to observe finality
    pub submission_id: String,
}

/// Outcome of a finalized call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedCall {
    pub submission_id: String,
    pub success: bool,
    /// Raw VM status string for diagnostics
    pub vm_status: String,
}

impl FinalizedCall {
    /// Whether the failure means the target resource already existed. An
    /// initialize racing another client lands here and is a success path.
    pub fn is_already_exists(&self) -> bool {
        let status = self.vm_status.to_ascii_lowercase();
        status.contains("resource_already_exists") || status.contains("already exists")
    }
}

/// Signs and submits entry calls. Implemented by the connected wallet; the
/// node never holds keys of its own.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_and_submit(&self, call: &EntryCall) -> Result<SubmittedCall, LedgerError>;
}

/// Blockchain read/submit interface: read a named resource for an account,
/// submit a signed call, and wait for a submitted call to finalize.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn read_resource(
        &self,
        account: &str,
        resource_type: &str,
    ) -> Result<serde_json::Value, LedgerError>;

    async fn submit(&self, call: &EntryCall) -> Result<SubmittedCall, LedgerError>;

    async fn wait_for_finality(&self, submission_id: &str) -> Result<FinalizedCall, LedgerError>;
}
