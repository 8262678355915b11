//! Upload coordination: local file -> content store -> ledger record
//!
//! The three network phases run strictly in sequence. A record is never
//! written referencing content that was not successfully stored; a stored
//! blob orphaned by a later ledger failure is acceptable, since the store is
//! de-duplicated and cheap to leave unreferenced.

use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LedgerConfig;
use crate::events::RefreshBus;
use crate::ledger::{EntryCall, LedgerClient, LedgerError};
use crate::local_state::{LocalStateStore, LAST_UPLOAD_KEY};
use crate::storage::{ContentStore, ContentStoreError};
use crate::types::Record;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Bad input; no I/O was attempted
    #[error("invalid input: {0}")]
    Validation(String),
    /// Account setup (the one-time record manager initialization) failed
    #[error("account initialization failed: {0}")]
    Initialization(String),
    #[error(transparent)]
    ContentStore(#[from] ContentStoreError),
    /// The record call was rejected at submission
    #[error("record submission rejected: {0}")]
    LedgerSubmit(String),
    /// The record call finalized unsuccessfully
    #[error("record transaction failed: {0}")]
    LedgerFinality(String),
}

/// Orchestrates one record upload end to end, including idempotent one-time
/// account initialization.
pub struct UploadCoordinator {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn ContentStore>,
    local: Arc<dyn LocalStateStore>,
    refresh: RefreshBus,
    config: LedgerConfig,
}

impl UploadCoordinator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn ContentStore>,
        local: Arc<dyn LocalStateStore>,
        refresh: RefreshBus,
        config: LedgerConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            local,
            refresh,
            config,
        }
    }

    /// Turn a local file plus two text fields into a finalized ledger record.
    ///
    /// Returns the record as appended. No cancellation: once started, the
    /// operation runs to completion or failure.
    pub async fn upload(
        &self,
        owner_account: &str,
        symptoms: &str,
        diagnosis: &str,
        file_bytes: &[u8],
        file_name: &str,
    ) -> Result<Record, UploadError> {
        // Fail fast before any network call
        if file_bytes.is_empty() {
            return Err(UploadError::Validation("file is empty".to_string()));
        }
        if symptoms.trim().is_empty() {
            return Err(UploadError::Validation("symptoms must not be empty".to_string()));
        }
        if diagnosis.trim().is_empty() {
            return Err(UploadError::Validation("diagnosis must not be empty".to_string()));
        }
        if owner_account.trim().is_empty() {
            return Err(UploadError::Validation("owner account must not be empty".to_string()));
        }

        self.ensure_initialized(owner_account).await?;

        // Store the content first; the ledger append must never start
        // without a content identifier in hand
        let stored = self.store.store(file_bytes, file_name).await?;
        debug!("content stored as {}", stored.content_id);

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = Record {
            owner_id: owner_account.to_string(),
            timestamp: timestamp.clone(),
            symptoms: symptoms.to_string(),
            diagnosis: diagnosis.to_string(),
            content_ref: stored.content_id.clone(),
            original_filename: None,
            version: None,
            modified_at: None,
            modified_by: None,
        };

        let call = EntryCall::new(
            owner_account,
            &self.config.function_id("add_record"),
            vec![
                json!(record.timestamp),
                json!(record.symptoms),
                json!(record.diagnosis),
                json!(record.content_ref),
            ],
        );

        let submitted = self
            .ledger
            .submit(&call)
            .await
            .map_err(|e| UploadError::LedgerSubmit(e.to_string()))?;

        let finalized = self
            .ledger
            .wait_for_finality(&submitted.submission_id)
            .await
            .map_err(|e| UploadError::LedgerFinality(e.to_string()))?;
        if !finalized.success {
            return Err(UploadError::LedgerFinality(finalized.vm_status));
        }

        info!(
            "record appended for {owner_account} with content {}",
            record.content_ref
        );
        self.local.set(LAST_UPLOAD_KEY, &timestamp);
        self.refresh.publish(&timestamp);

        Ok(record)
    }

    /// Make sure the record manager resource exists, creating it on first
    /// use. Idempotent from the caller's perspective: a manager that already
    /// exists, including one created by a racing client between our read and
    /// our initialize, is a success path.
    async fn ensure_initialized(&self, owner_account: &str) -> Result<(), UploadError> {
        let address = self.config.manager_address(owner_account);
        let resource_type = self.config.manager_resource_type();

        match self.ledger.read_resource(&address, &resource_type).await {
            Ok(_) => {
                debug!("record manager already present at {address}");
                return Ok(());
            }
            Err(LedgerError::ResourceNotFound(_)) => {}
            Err(e) => return Err(UploadError::Initialization(e.to_string())),
        }

        info!("initializing record manager at {address}");
        let call = EntryCall::new(owner_account, &self.config.function_id("initialize"), vec![]);

        let submitted = self
            .ledger
            .submit(&call)
            .await
            .map_err(|e| UploadError::Initialization(e.to_string()))?;
        let finalized = self
            .ledger
            .wait_for_finality(&submitted.submission_id)
            .await
            .map_err(|e| UploadError::Initialization(e.to_string()))?;

        if finalized.success || finalized.is_already_exists() {
            Ok(())
        } else {
            Err(UploadError::Initialization(finalized.vm_status))
        }
    }
}
