//! Contract suites against the in-process fake server.
//!
//! A conforming server must pass every suite in both addressing styles, and each
//! injected contract violation must fail exactly the tests that check it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use contract_harness::config::HarnessConfig;
use contract_harness::report::{RunReport, TestOutcome};
use contract_test_utils::{ServerBehavior, TestCrudServer};
use serde_json::json;
use std::collections::HashMap;

async fn run_against(server: &TestCrudServer, extra: &[(&str, &str)]) -> RunReport {
    let mut vars: HashMap<String, String> =
        HashMap::from([("CONTRACT_BASE_URL".to_string(), server.url())]);
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    let config = HarnessConfig::from_vars(&vars).expect("valid config");
    crud_contract::run(&config).await.expect("known suites")
}

fn assert_failed(report: &RunReport, suite: &str, test: &str, needle: &str) {
    match report.suite(suite).and_then(|s| s.outcome(test)) {
        Some(TestOutcome::Failed(msg)) => {
            assert!(msg.contains(needle), "{:?} should mention {:?}", msg, needle)
        }
        other => panic!("{} / {}: expected failure, got {:?}\n{}", suite, test, other, report),
    }
}

#[tokio::test]
async fn test_conforming_server_passes_with_identifier_in_list() {
    let server = TestCrudServer::spawn(ServerBehavior::default()).await.unwrap();

    let report = run_against(&server, &[("CONTRACT_LOCATOR", "list")]).await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.passed(), 14);
    assert!(server.records().is_empty(), "teardown should leave the collection empty");
}

#[tokio::test]
async fn test_conforming_server_passes_with_location_header() {
    let server = TestCrudServer::spawn(ServerBehavior::with_location_header())
        .await
        .unwrap();

    let report = run_against(&server, &[("CONTRACT_LOCATOR", "location")]).await;

    assert!(report.is_success(), "{}", report);
    assert!(server.records().is_empty());
}

#[tokio::test]
async fn test_detected_location_strategy_skips_collection_reread() {
    let server = TestCrudServer::spawn(ServerBehavior::with_location_header())
        .await
        .unwrap();

    let report = run_against(&server, &[("CONTRACT_SUITES", "update")]).await;
    assert!(report.is_success(), "{}", report);

    // DELETE (clear), POST, then straight to the updates: no listing in between.
    let requests = server.requests();
    assert_eq!(requests[0], "DELETE /api");
    assert_eq!(requests[1], "POST /api");
    assert!(requests[2].starts_with("PUT /api/"), "{:?}", requests);
}

#[tokio::test]
async fn test_setup_chain_is_sequential() {
    let server = TestCrudServer::spawn(ServerBehavior::default()).await.unwrap();

    run_against(&server, &[("CONTRACT_SUITES", "update"), ("CONTRACT_LOCATOR", "list")]).await;

    let requests = server.requests();
    assert_eq!(&requests[..3], &["DELETE /api", "POST /api", "GET /api"]);
    assert!(requests[3].starts_with("PUT /api/"));
    assert_eq!(requests.last().unwrap(), "DELETE /api");
}

#[tokio::test]
async fn test_suites_run_one_after_another() {
    let server = TestCrudServer::spawn(ServerBehavior::default()).await.unwrap();

    let report = run_against(&server, &[]).await;
    let keys: Vec<&str> = report.suites.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["cors", "create", "update", "delete"]);

    // The first request of each suite follows the previous suite's teardown.
    let requests = server.requests();
    assert_eq!(requests[0], "OPTIONS /api");
    assert_eq!(requests[1], "DELETE /api", "create suite starts after cors finished");
}

#[tokio::test]
async fn test_missing_cors_headers_fail_cors_suite_only() {
    let server = TestCrudServer::spawn(ServerBehavior {
        cors: false,
        ..Default::default()
    })
    .await
    .unwrap();

    let report = run_against(&server, &[]).await;

    assert_failed(
        &report,
        "cors",
        "should return the correct CORS headers",
        "access-control-allow-methods",
    );
    assert_failed(
        &report,
        "cors",
        "should allow all origins",
        "access-control-allow-origin",
    );
    assert!(report.suite("create").unwrap().is_success());
    assert!(report.suite("delete").unwrap().is_success());
}

#[tokio::test]
async fn test_lossy_patch_is_detected() {
    let server = TestCrudServer::spawn(ServerBehavior {
        lossy_patch: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let report = run_against(&server, &[("CONTRACT_SUITES", "update")]).await;
    let update = report.suite("update").unwrap();

    assert_eq!(
        update.outcome("should have phone set to (+972) 050 - 4945555 PATCH update"),
        Some(&TestOutcome::Passed)
    );
    assert_failed(
        &report,
        "update",
        "should leave other fields unchanged after PATCH update",
        "to have property",
    );
}

#[tokio::test]
async fn test_unsaved_updates_are_detected() {
    let server = TestCrudServer::spawn(ServerBehavior {
        drop_updates: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let report = run_against(&server, &[("CONTRACT_SUITES", "update")]).await;
    let update = report.suite("update").unwrap();

    assert_eq!(
        update.outcome("should have restaurant_type set to Burger after PUT update"),
        Some(&TestOutcome::Passed)
    );
    assert_eq!(
        update.outcome("should have phone set to (+972) 050 - 4945555 PATCH update"),
        Some(&TestOutcome::Passed)
    );
    assert_failed(
        &report,
        "update",
        "should persist restaurant_type set to Burger after PUT update",
        "body.restaurant_type to equal \"Burger\"",
    );
    assert_failed(
        &report,
        "update",
        "should persist phone set to (+972) 050 - 4945555 after PATCH update",
        "body.phone to equal",
    );
    assert_failed(
        &report,
        "update",
        "should leave other fields unchanged after PATCH update",
        "body.phone to equal",
    );
}

#[tokio::test]
async fn test_empty_reads_do_not_count_as_identical() {
    let server = TestCrudServer::spawn(ServerBehavior {
        empty_single_reads: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let report = run_against(&server, &[("CONTRACT_SUITES", "create")]).await;

    assert_failed(
        &report,
        "create",
        "should return the same record on consecutive reads",
        "expected body to be present",
    );
    assert_eq!(
        report
            .suite("create")
            .unwrap()
            .outcome("should have restaurant_name property equal to 'Hudson'"),
        Some(&TestOutcome::Passed)
    );
}

#[tokio::test]
async fn test_undeleted_resource_is_detected() {
    let server = TestCrudServer::spawn(ServerBehavior {
        ignore_single_delete: true,
        ..Default::default()
    })
    .await
    .unwrap();

    let report = run_against(&server, &[("CONTRACT_SUITES", "delete")]).await;
    let delete = report.suite("delete").unwrap();

    assert_eq!(
        delete.outcome("should return 204 NO CONTENT response"),
        Some(&TestOutcome::Passed)
    );
    assert_failed(
        &report,
        "delete",
        "should return Not Found for the deleted restaurant",
        "resolved with status 200",
    );
    assert_eq!(
        delete.outcome("should return empty restaurants list"),
        Some(&TestOutcome::Passed)
    );
}

#[tokio::test]
async fn test_wrong_id_field_skips_suite_and_still_tears_down() {
    let server = TestCrudServer::spawn(ServerBehavior::default()).await.unwrap();

    let report = run_against(
        &server,
        &[
            ("CONTRACT_SUITES", "update"),
            ("CONTRACT_LOCATOR", "list"),
            ("CONTRACT_ID_FIELD", "id"),
        ],
    )
    .await;
    let update = report.suite("update").unwrap();

    assert_eq!(update.skipped(), 5);
    assert!(update.setup_error.as_deref().unwrap().contains("\"id\""));
    assert!(server.records().is_empty(), "after hook must still clear the collection");
}

#[tokio::test]
async fn test_unrelated_records_are_cleared_before_create() {
    let server = TestCrudServer::spawn(ServerBehavior::default()).await.unwrap();
    server.seed(json!({"restaurant_name": "Leftover"}));

    let report = run_against(&server, &[("CONTRACT_SUITES", "create")]).await;

    assert!(report.is_success(), "{}", report);
}

#[tokio::test]
async fn test_delete_suite_never_targets_leftover_records() {
    let server = TestCrudServer::spawn(ServerBehavior::default()).await.unwrap();
    let leftover = server.seed(json!({"restaurant_name": "Leftover"}));

    let report = run_against(
        &server,
        &[("CONTRACT_SUITES", "delete"), ("CONTRACT_LOCATOR", "list")],
    )
    .await;

    assert!(report.is_success(), "{}", report);
    let requests = server.requests();
    assert_eq!(requests[0], "DELETE /api");
    assert!(
        !requests.contains(&format!("DELETE /api/{}", leftover)),
        "{:?}",
        requests
    );
}

#[tokio::test]
async fn test_unreachable_server_fails_every_test() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = HarnessConfig::for_url(format!("http://127.0.0.1:{}/api", port)).unwrap();

    let report = crud_contract::run(&config).await.unwrap();

    assert_eq!(report.passed(), 0);
    assert!(!report.is_success());
    let cors = report.suite("cors").unwrap();
    assert_eq!(cors.failed(), 2, "{}", report);
}

#[tokio::test]
async fn test_unknown_suite_is_configuration_error() {
    let vars = HashMap::from([("CONTRACT_SUITES".to_string(), "nope".to_string())]);
    let config = HarnessConfig::from_vars(&vars).unwrap();

    let err = crud_contract::run(&config).await.unwrap_err();
    assert!(err.to_string().contains("nope"));
}
