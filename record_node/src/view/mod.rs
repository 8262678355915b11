//! Record listing, aggregate stats, and the client-local hidden set
//!
//! The hidden set is advisory view state: "deleting" a record hides it
//! locally and never touches the authoritative on-ledger sequence, which has
//! no delete operation at all.

use chrono::{SecondsFormat, Utc};
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::events::RefreshBus;
use crate::ledger::{LedgerClient, LedgerError};
use crate::local_state::{LocalStateStore, HIDDEN_RECORDS_KEY};
use crate::types::{AccountStats, LedgerStats, Record, RecordManager};

/// Read-side facade over the record manager resource plus the local hidden
/// set. Thin UI shells consume this and render.
pub struct RecordCatalog {
    ledger: Arc<dyn LedgerClient>,
    local: Arc<dyn LocalStateStore>,
    refresh: RefreshBus,
    config: LedgerConfig,
}

impl RecordCatalog {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        local: Arc<dyn LocalStateStore>,
        refresh: RefreshBus,
        config: LedgerConfig,
    ) -> Self {
        Self {
            ledger,
            local,
            refresh,
            config,
        }
    }

    /// All records in the scoped manager resource, in append order. A
    /// missing manager reads as an empty list, not an error.
    pub async fn records(&self, owner_account: &str) -> Result<Vec<Record>, LedgerError> {
        let address = self.config.manager_address(owner_account);
        let resource_type = self.config.manager_resource_type();

        let value = match self.ledger.read_resource(&address, &resource_type).await {
            Ok(value) => value,
            Err(LedgerError::ResourceNotFound(_)) => {
                debug!("no record manager at {address}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let manager = RecordManager::from_resource(&value)
            .map_err(|e| LedgerError::InvalidResponse(format!("record manager: {e}")))?;
        Ok(manager.records)
    }

    /// Records with the locally hidden ones filtered out
    pub async fn visible_records(&self, owner_account: &str) -> Result<Vec<Record>, LedgerError> {
        let hidden = self.hidden();
        let records = self.records(owner_account).await?;
        Ok(records
            .into_iter()
            .filter(|r| !hidden.contains(&r.content_ref))
            .collect())
    }

    /// Dashboard aggregate for one account
    pub async fn account_stats(&self, owner_account: &str) -> Result<AccountStats, LedgerError> {
        let records = self.records(owner_account).await?;
        let owned: Vec<&Record> = records
            .iter()
            .filter(|r| r.owner_id == owner_account)
            .collect();
        Ok(AccountStats {
            total_records: owned.len() as u64,
            last_upload: owned.last().map(|r| r.timestamp.clone()),
        })
    }

    /// Ledger-wide aggregate across every owning account
    pub async fn ledger_stats(&self, owner_account: &str) -> Result<LedgerStats, LedgerError> {
        let records = self.records(owner_account).await?;
        let owners: HashSet<&str> = records.iter().map(|r| r.owner_id.as_str()).collect();
        Ok(LedgerStats {
            total_records: records.len() as u64,
            total_accounts: owners.len() as u64,
        })
    }

    /// Currently hidden content references
    pub fn hidden(&self) -> HashSet<String> {
        self.local
            .get(HIDDEN_RECORDS_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(HashSet::from_iter)
            .unwrap_or_default()
    }

    /// Hide a record locally. The on-ledger sequence is untouched.
    pub fn hide(&self, content_ref: &str) {
        let mut hidden = self.hidden();
        if hidden.insert(content_ref.to_string()) {
            self.persist_hidden(&hidden);
        }
    }

    /// Make a hidden record visible again
    pub fn unhide(&self, content_ref: &str) {
        let mut hidden = self.hidden();
        if hidden.remove(content_ref) {
            self.persist_hidden(&hidden);
        }
    }

    /// Drop the whole hidden set
    pub fn clear_hidden(&self) {
        self.local.remove(HIDDEN_RECORDS_KEY);
        self.notify();
    }

    fn persist_hidden(&self, hidden: &HashSet<String>) {
        let mut ordered: Vec<&String> = hidden.iter().collect();
        ordered.sort();
        match serde_json::to_string(&ordered) {
            Ok(encoded) => self.local.set(HIDDEN_RECORDS_KEY, &encoded),
            Err(e) => debug!("failed to encode hidden set: {e}"),
        }
        self.notify();
    }

    fn notify(&self) {
        self.refresh
            .publish(&Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    }
}
