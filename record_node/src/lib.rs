//! MedLedger client node library.
//!
//! Turns a local medical file plus free-text symptoms/diagnosis into a
//! finalized on-ledger record whose content lives in a content-addressed
//! store, and resolves such records back into bytes through a redundant set
//! of public gateways.

pub mod config;
pub mod events;
pub mod ledger;
pub mod local_state;
pub mod storage;
pub mod types;
pub mod upload;
pub mod view;
pub mod wallet;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::AppConfig;
pub use events::{RefreshBus, RefreshSignal};
pub use storage::retrieval::{RetrievalError, RetrievalResolver, RetrievedContent};
pub use types::{classify, ContentRefKind, Record};
pub use upload::{UploadCoordinator, UploadError};
