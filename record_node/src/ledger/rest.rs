//! REST ledger client
//!
//! Reads resources and observes finality over the fullnode REST API.
//! Submission goes through the injected wallet signer, since only the wallet
//! can produce a signed call.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use super::{EntryCall, FinalizedCall, LedgerClient, LedgerError, SubmittedCall, TransactionSigner};
use crate::config::LedgerConfig;

pub struct RestLedgerClient {
    client: Client,
    base_url: String,
    signer: Arc<dyn TransactionSigner>,
    poll_interval: Duration,
    max_polls: u32,
}

impl RestLedgerClient {
    pub fn new(
        config: &LedgerConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            signer,
            poll_interval: Duration::from_millis(config.finality_poll_ms),
            max_polls: config.finality_max_polls,
        })
    }

    fn resource_url(&self, account: &str, resource_type: &str) -> String {
        format!(
            "{}/v1/accounts/{}/resource/{}",
            self.base_url,
            account,
            urlencoding::encode(resource_type)
        )
    }

    async fn fetch_finalized(&self, submission_id: &str) -> Result<Option<FinalizedCall>, LedgerError> {
        let url = format!("{}/v1/transactions/by_hash/{}", self.base_url, submission_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("finality poll failed: {e}")))?;

        // Not yet indexed: keep polling
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LedgerError::Finality(format!(
                "finality poll returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("finality body: {e}")))?;

        // Still pending in the mempool
        if body["type"].as_str() == Some("pending_transaction") {
            return Ok(None);
        }

        let success = body["success"].as_bool().ok_or_else(|| {
            LedgerError::InvalidResponse("finalized transaction missing success flag".to_string())
        })?;

        Ok(Some(FinalizedCall {
            submission_id: submission_id.to_string(),
            success,
            vm_status: body["vm_status"].as_str().unwrap_or("").to_string(),
        }))
    }
}

#[async_trait]
impl LedgerClient for RestLedgerClient {
    async fn read_resource(
        &self,
        account: &str,
        resource_type: &str,
    ) -> Result<serde_json::Value, LedgerError> {
        let url = self.resource_url(account, resource_type);
        debug!("reading ledger resource {resource_type} at {account}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("resource read failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LedgerError::ResourceNotFound(resource_type.to_string()));
        }
        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "resource read returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("resource body: {e}")))?;

        // The REST shape wraps fields under "data"; tolerate bare resources
        Ok(body.get("data").cloned().unwrap_or(body))
    }

    async fn submit(&self, call: &EntryCall) -> Result<SubmittedCall, LedgerError> {
        debug!("submitting entry call {}", call.function);
        self.signer.sign_and_submit(call).await
    }

    async fn wait_for_finality(&self, submission_id: &str) -> Result<FinalizedCall, LedgerError> {
        for attempt in 0..self.max_polls {
            if let Some(finalized) = self.fetch_finalized(submission_id).await? {
                debug!(
                    "call {} finalized after {} polls (success={})",
                    submission_id,
                    attempt + 1,
                    finalized.success
                );
                return Ok(finalized);
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(LedgerError::Finality(format!(
            "call {submission_id} not finalized after {} polls",
            self.max_polls
        )))
    }
}
