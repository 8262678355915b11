use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use crate::config::{LedgerConfig, OwnerScope};
use crate::events::RefreshBus;
use crate::ledger::LedgerError;
use crate::local_state::{LocalStateStore, MemoryStateStore, LAST_UPLOAD_KEY};
use crate::storage::ContentStoreError;
use crate::tests::support::{MockLedger, MockStore};
use crate::upload::{UploadCoordinator, UploadError};

const OWNER: &str = "0xpatient";

fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        rest_url: "http://localhost:8080".to_string(),
        registry_address: "0xregistry".to_string(),
        owner_scope: OwnerScope::SharedRegistry,
        finality_poll_ms: 1,
        finality_max_polls: 3,
    }
}

struct Harness {
    ledger: Arc<MockLedger>,
    store: Arc<MockStore>,
    local: Arc<MemoryStateStore>,
    refresh: RefreshBus,
    coordinator: UploadCoordinator,
}

fn harness(ledger: MockLedger, store: MockStore) -> Harness {
    let ledger = Arc::new(ledger);
    let store = Arc::new(store);
    let local = Arc::new(MemoryStateStore::default());
    let refresh = RefreshBus::default();
    let coordinator = UploadCoordinator::new(
        ledger.clone(),
        store.clone(),
        local.clone(),
        refresh.clone(),
        ledger_config(),
    );
    Harness {
        ledger,
        store,
        local,
        refresh,
        coordinator,
    }
}

fn existing_manager() -> MockLedger {
    MockLedger::with_resource(json!({ "records": [] }))
}

#[tokio::test]
async fn happy_path_appends_record_with_stored_content_id() {
    let h = harness(existing_manager(), MockStore::succeeding("QmAbc123", "a.pdf"));

    let record = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await
        .expect("upload");

    assert_eq!(record.content_ref, "QmAbc123");
    assert_eq!(record.symptoms, "fever");
    assert_eq!(record.diagnosis, "flu");
    assert_eq!(record.owner_id, OWNER);
    assert!(record.original_filename.is_none());

    let functions = h.ledger.submitted_functions();
    assert_eq!(functions, vec!["0xregistry::records::add_record".to_string()]);
    let call = h.ledger.submissions.lock().unwrap()[0].clone();
    assert_eq!(call.sender, OWNER);
    assert_eq!(call.arguments[3], json!("QmAbc123"));
}

#[tokio::test]
async fn existing_manager_skips_initialize() {
    let h = harness(existing_manager(), MockStore::succeeding("QmAbc123", "a.pdf"));

    h.coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await
        .expect("upload");

    let functions = h.ledger.submitted_functions();
    assert!(!functions.iter().any(|f| f.contains("initialize")));
}

#[tokio::test]
async fn missing_manager_initializes_before_appending() {
    let ledger = MockLedger::with_read_result(Err(LedgerError::ResourceNotFound(
        "0xregistry::records::RecordManager".to_string(),
    )));
    let h = harness(ledger, MockStore::succeeding("QmAbc123", "a.pdf"));

    h.coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await
        .expect("upload");

    let functions = h.ledger.submitted_functions();
    assert_eq!(
        functions,
        vec![
            "0xregistry::records::initialize".to_string(),
            "0xregistry::records::add_record".to_string()
        ]
    );
}

#[tokio::test]
async fn racing_initialize_that_already_exists_is_a_success_path() {
    let ledger = MockLedger::with_read_result(Err(LedgerError::ResourceNotFound(
        "manager".to_string(),
    )));
    ledger.queue_finality(false, "Move abort: RESOURCE_ALREADY_EXISTS");
    let h = harness(ledger, MockStore::succeeding("QmAbc123", "a.pdf"));

    h.coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await
        .expect("upload");

    assert_eq!(h.ledger.submitted_functions().len(), 2);
}

#[tokio::test]
async fn failed_initialize_aborts_the_upload() {
    let ledger = MockLedger::with_read_result(Err(LedgerError::ResourceNotFound(
        "manager".to_string(),
    )));
    ledger.queue_finality(false, "OUT_OF_GAS");
    let h = harness(ledger, MockStore::succeeding("QmAbc123", "a.pdf"));

    let result = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await;

    assert!(matches!(result, Err(UploadError::Initialization(_))));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_not_found_read_error_propagates_immediately() {
    let ledger =
        MockLedger::with_read_result(Err(LedgerError::Transport("connection refused".to_string())));
    let h = harness(ledger, MockStore::succeeding("QmAbc123", "a.pdf"));

    let result = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await;

    assert!(matches!(result, Err(UploadError::Initialization(_))));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    assert!(h.ledger.submitted_functions().is_empty());
}

#[tokio::test]
async fn store_failure_never_reaches_the_ledger_submit() {
    let h = harness(
        existing_manager(),
        MockStore::failing(ContentStoreError::Rejected {
            status: 500,
            message: "pin failed".to_string(),
        }),
    );

    let result = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await;

    assert!(matches!(result, Err(UploadError::ContentStore(_))));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 1);
    assert!(h.ledger.submitted_functions().is_empty());
}

#[tokio::test]
async fn store_error_kinds_distinguish_unreachable_from_rejected() {
    let h = harness(
        existing_manager(),
        MockStore::failing(ContentStoreError::Unreachable {
            message: "connection refused".to_string(),
        }),
    );

    let result = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await;

    match result {
        Err(UploadError::ContentStore(ContentStoreError::Unreachable { message })) => {
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_finality_on_append_is_a_hard_failure() {
    let ledger = existing_manager();
    ledger.queue_finality(false, "EXECUTION_FAILURE");
    let h = harness(ledger, MockStore::succeeding("QmAbc123", "a.pdf"));

    let result = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await;

    match result {
        Err(UploadError::LedgerFinality(status)) => assert_eq!(status, "EXECUTION_FAILURE"),
        other => panic!("expected LedgerFinality, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_submission_surfaces_as_submit_error() {
    let ledger = existing_manager();
    *ledger.submit_error.lock().unwrap() =
        Some(LedgerError::Submission("sequence number too old".to_string()));
    let h = harness(ledger, MockStore::succeeding("QmAbc123", "a.pdf"));

    let result = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await;

    assert!(matches!(result, Err(UploadError::LedgerSubmit(_))));
}

#[tokio::test]
async fn invalid_inputs_fail_before_any_network_call() {
    let h = harness(existing_manager(), MockStore::succeeding("QmAbc123", "a.pdf"));

    for (symptoms, diagnosis, file) in [
        ("", "flu", b"bytes".as_slice()),
        ("fever", " ", b"bytes".as_slice()),
        ("fever", "flu", b"".as_slice()),
    ] {
        let result = h.coordinator.upload(OWNER, symptoms, diagnosis, file, "a.pdf").await;
        assert!(matches!(result, Err(UploadError::Validation(_))));
    }

    assert_eq!(h.ledger.read_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    assert!(h.ledger.submitted_functions().is_empty());
}

#[tokio::test]
async fn successful_upload_notifies_observers_and_records_the_token() {
    let h = harness(existing_manager(), MockStore::succeeding("QmAbc123", "a.pdf"));
    let mut refreshes = h.refresh.subscribe();

    let record = h
        .coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await
        .expect("upload");

    let signal = refreshes.try_recv().expect("refresh signal");
    assert_eq!(signal.at, record.timestamp);
    assert_eq!(h.local.get(LAST_UPLOAD_KEY), Some(record.timestamp));
}

#[tokio::test]
async fn per_account_scope_targets_the_owner_address() {
    let ledger = MockLedger::with_read_result(Err(LedgerError::ResourceNotFound(
        "manager".to_string(),
    )));
    let store = MockStore::succeeding("QmAbc123", "a.pdf");
    let ledger = Arc::new(ledger);
    let config = LedgerConfig {
        owner_scope: OwnerScope::PerAccount,
        ..ledger_config()
    };
    let coordinator = UploadCoordinator::new(
        ledger.clone(),
        Arc::new(store),
        Arc::new(MemoryStateStore::default()),
        RefreshBus::default(),
        config.clone(),
    );

    coordinator
        .upload(OWNER, "fever", "flu", b"file-bytes", "a.pdf")
        .await
        .expect("upload");

    // Scoping only changes which address the manager is read from; the
    // config helper is what the read path consults
    assert_eq!(config.manager_address(OWNER), OWNER);
    assert_eq!(ledger.submitted_functions().len(), 2);
}
