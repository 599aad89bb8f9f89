//! End-to-end tests of the HTTP API against mock collaborators.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use statif_core::LockManager;

use common::TestFixture;

// =============================================================================
// Health and config
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["crawler"]["program"], "/opt/statif/crawl.sh");
    assert!(response.body["crawler"]["env_keys"].is_array());
    assert!(response.body["crawler"].get("env").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/api/v1/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("statif_http_requests_total"));
    assert!(body.contains("statif_lock_held"));
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn test_status_of_fresh_install() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "production");
    assert_eq!(response.body["sha"], "");
    assert_eq!(response.body["crawling"], false);
    assert_eq!(response.body["locked"], false);
    assert_eq!(response.body["background"], json!({}));
}

// =============================================================================
// Full lifecycle
// =============================================================================

#[tokio::test]
async fn test_crawl_save_deploy_flow() {
    let fixture = TestFixture::new().await;

    // Start a crawl
    let response = fixture
        .post_as(
            "alice",
            "/api/v1/statifications",
            json!({"designation": "Site A", "description": "weekly"}),
        )
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body, json!({"success": true}));

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_eq!(response.body["status"], "created");
    assert_eq!(response.body["designation"], "Site A");
    assert_eq!(response.body["crawling"], true);

    // The crawl finishes
    std::fs::write(&fixture.lifecycle.paths.log_file, "crawl log").unwrap();
    fixture.crawler().finish(10);

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_eq!(response.body["status"], "statified");
    assert_eq!(response.body["items_crawled"], 10);

    // Archive it
    let response = fixture
        .post_empty_as("alice", "/api/v1/statifications/current/save")
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    fixture.wait_idle().await;

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_eq!(response.body["status"], "saved");
    assert_eq!(response.body["background"]["success"], true);
    assert_eq!(response.body["background"]["operation"], "archive");
    let hash = response.body["sha"].as_str().unwrap().to_string();
    assert_eq!(response.body["background"]["sha"], hash.as_str());

    // Deploy it
    let response = fixture
        .post_empty_as("bob", &format!("/api/v1/statifications/{}/deploy", hash))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    fixture.wait_idle().await;

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_eq!(response.body["status"], "production");
    assert_eq!(response.body["background"]["operation"], "deploy");
    assert_eq!(fixture.deployer().deployed(), vec![hash.clone()]);

    // Detail, history and count
    let response = fixture
        .get(&format!("/api/v1/statifications/{}", hash))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["statification"]["designation"], "Site A");
    assert_eq!(response.body["statification"]["item_count"], 10);
    let actions: Vec<_> = response.body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        actions,
        vec![
            "create_statification",
            "crawl_completed",
            "save_statification",
            "push_to_production",
        ]
    );

    let response = fixture.get("/api/v1/statifications/count").await;
    assert_eq!(response.body["count"], 1);

    let response = fixture
        .get("/api/v1/statifications?limit=5&order=upd_date")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["limit"], 5);
    assert_eq!(response.body["statifications"][0]["content_hash"], hash.as_str());
}

#[tokio::test]
async fn test_visualize_flow() {
    let fixture = TestFixture::new().await;
    let hash = "c".repeat(40);
    fixture.archiver().add_archive(&hash);

    // A known archive without a record fails in the background
    let response = fixture
        .post_empty_as("carol", &format!("/api/v1/statifications/{}/visualize", hash))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    fixture.wait_idle().await;

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_eq!(
        response.body["background"],
        json!({
            "success": false,
            "operation": "visualize",
            "error": "store_inconsistency",
            "sha": hash,
        })
    );
}

// =============================================================================
// Synchronous refusals
// =============================================================================

#[tokio::test]
async fn test_unknown_hash_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_empty_as(
            "alice",
            &format!("/api/v1/statifications/{}/visualize", "f".repeat(40)),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({"success": false, "error": "invalid_input"})
    );
    assert!(!fixture.lifecycle.lock.is_locked().unwrap());

    let response = fixture.get("/api/v1/statifications/not-a-hash").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_user_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_anonymous("/api/v1/statifications/current/save")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
}

#[tokio::test]
async fn test_crawl_while_running_is_conflict() {
    let fixture = TestFixture::new().await;
    fixture.crawler().set_running(true);

    let response = fixture
        .post_as(
            "alice",
            "/api/v1/statifications",
            json!({"designation": "Site A"}),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "already_running");

    let response = fixture.get("/api/v1/statifications/count").await;
    assert_eq!(response.body["count"], 0);
}

#[tokio::test]
async fn test_held_lock_is_conflict() {
    let fixture = TestFixture::new().await;
    assert!(fixture.lifecycle.lock.try_acquire().unwrap());

    let response = fixture
        .post_as(
            "alice",
            "/api/v1/statifications",
            json!({"designation": "Site A"}),
        )
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "lock_unavailable");

    let response = fixture.get("/api/v1/statifications/status").await;
    assert_eq!(response.body["locked"], true);
}

#[tokio::test]
async fn test_save_without_crawl_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_empty_as("alice", "/api/v1/statifications/current/save")
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "store_inconsistency");

    let response = fixture.get("/api/v1/statifications/current").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stop_without_crawl_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_empty_as("alice", "/api/v1/statifications/current/stop")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
}

#[tokio::test]
async fn test_stop_running_crawl() {
    let fixture = TestFixture::new().await;
    fixture
        .post_as(
            "alice",
            "/api/v1/statifications",
            json!({"designation": "Site A"}),
        )
        .await;

    let response = fixture
        .post_empty_as("alice", "/api/v1/statifications/current/stop")
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(fixture.crawler().stop_count(), 1);

    let response = fixture.get("/api/v1/statifications/current").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["statification"]["designation"], "Site A");
}

#[tokio::test]
async fn test_history_rejects_unknown_order() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .get("/api/v1/statifications?order=content_hash")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
}
