//! Shared test doubles for the record workflow

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ledger::{
    EntryCall, FinalizedCall, LedgerClient, LedgerError, SubmittedCall,
};
use crate::storage::retrieval::{FetchFailure, FetchedBody, GatewayFetcher};
use crate::storage::{ContentStore, ContentStoreError, StoredContent};

/// Scriptable ledger double that counts every interaction
pub struct MockLedger {
    pub read_result: Mutex<Result<serde_json::Value, LedgerError>>,
    pub read_calls: AtomicUsize,
    pub submissions: Mutex<Vec<EntryCall>>,
    pub submit_error: Mutex<Option<LedgerError>>,
    /// Consumed front-to-back by `wait_for_finality`; empty means success
    pub finality_queue: Mutex<VecDeque<FinalizedCall>>,
}

impl MockLedger {
    pub fn with_resource(value: serde_json::Value) -> Self {
        Self::with_read_result(Ok(value))
    }

    pub fn with_read_result(result: Result<serde_json::Value, LedgerError>) -> Self {
        Self {
            read_result: Mutex::new(result),
            read_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            submit_error: Mutex::new(None),
            finality_queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_finality(&self, success: bool, vm_status: &str) {
        self.finality_queue.lock().unwrap().push_back(FinalizedCall {
            submission_id: String::new(),
            success,
            vm_status: vm_status.to_string(),
        });
    }

    pub fn submitted_functions(&self) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.function.clone())
            .collect()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn read_resource(
        &self,
        _account: &str,
        _resource_type: &str,
    ) -> Result<serde_json::Value, LedgerError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.read_result.lock().unwrap().clone()
    }

    async fn submit(&self, call: &EntryCall) -> Result<SubmittedCall, LedgerError> {
        if let Some(error) = self.submit_error.lock().unwrap().clone() {
            return Err(error);
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(call.clone());
        Ok(SubmittedCall {
            submission_id: format!("0x{:04x}", submissions.len()),
        })
    }

    async fn wait_for_finality(&self, submission_id: &str) -> Result<FinalizedCall, LedgerError> {
        let mut queue = self.finality_queue.lock().unwrap();
        Ok(queue.pop_front().unwrap_or(FinalizedCall {
            submission_id: submission_id.to_string(),
            success: true,
            vm_status: "Executed successfully".to_string(),
        }))
    }
}

/// Content store double with a call counter
pub struct MockStore {
    pub result: Mutex<Result<StoredContent, ContentStoreError>>,
    pub calls: AtomicUsize,
}

impl MockStore {
    pub fn succeeding(content_id: &str, file_name: &str) -> Self {
        Self {
            result: Mutex::new(Ok(StoredContent {
                content_id: content_id.to_string(),
                file_name: file_name.to_string(),
            })),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ContentStoreError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn store(&self, _bytes: &[u8], _file_name: &str) -> Result<StoredContent, ContentStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

/// Gateway fetcher double scripted per URL
#[derive(Default)]
pub struct MockFetcher {
    pub get_responses: Mutex<HashMap<String, Result<FetchedBody, FetchFailure>>>,
    pub head_responses: Mutex<HashMap<String, Result<u16, FetchFailure>>>,
    pub get_calls: Mutex<Vec<String>>,
    pub head_calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn on_get(&self, url: &str, response: Result<FetchedBody, FetchFailure>) {
        self.get_responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn on_head(&self, url: &str, response: Result<u16, FetchFailure>) {
        self.head_responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.lock().unwrap().len()
    }

    pub fn head_call_count(&self) -> usize {
        self.head_calls.lock().unwrap().len()
    }
}

pub fn body(status: u16, content_type: &str, bytes: &[u8]) -> FetchedBody {
    FetchedBody {
        status,
        content_type: Some(content_type.to_string()),
        content_disposition: None,
        bytes: bytes.to_vec(),
    }
}

pub fn transport_failure(message: &str) -> FetchFailure {
    FetchFailure {
        message: message.to_string(),
    }
}

#[async_trait]
impl GatewayFetcher for MockFetcher {
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchFailure> {
        self.get_calls.lock().unwrap().push(url.to_string());
        self.get_responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(transport_failure("no scripted response")))
    }

    async fn head(&self, url: &str) -> Result<u16, FetchFailure> {
        self.head_calls.lock().unwrap().push(url.to_string());
        self.head_responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(transport_failure("no scripted response")))
    }
}
