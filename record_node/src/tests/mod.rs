mod support;

mod upload_coordinator_tests;
