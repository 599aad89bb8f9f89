//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock collaborators injected, enabling E2E testing without `tar`,
//! a crawler or a deploy script.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use statif_core::load_config_from_str;
use statif_core::testing::{MockArchiver, MockCrawler, MockDeployer, TestLifecycle};
use statif_server::state::AppState;

const TEST_CONFIG: &str = r#"
[crawler]
program = "/opt/statif/crawl.sh"

[deploy]
script = "/opt/statif/push_to_prod.sh"

[server]
host = "127.0.0.1"
port = 8080
"#;

/// Test fixture for E2E testing with mock collaborators.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_crawl() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .post_as("alice", "/api/v1/statifications", json!({"designation": "Site A"}))
///         .await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Lifecycle wiring with in-memory lock and status artifact
    pub lifecycle: TestLifecycle,
    /// Temporary directory holding the database and working directories
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let lifecycle = TestLifecycle::new(temp_dir.path());

        let mut config = load_config_from_str(TEST_CONFIG).expect("Failed to parse test config");
        config.paths = lifecycle.paths.clone();
        config.database.path = temp_dir.path().join("statif.db");

        let state = Arc::new(AppState::new(config, Arc::clone(&lifecycle.service)));
        let router = statif_server::api::create_router(state);

        Self {
            router,
            lifecycle,
            temp_dir,
        }
    }

    pub fn archiver(&self) -> &MockArchiver {
        &self.lifecycle.archiver
    }

    pub fn crawler(&self) -> &MockCrawler {
        &self.lifecycle.crawler
    }

    pub fn deployer(&self) -> &MockDeployer {
        &self.lifecycle.deployer
    }

    /// Wait for the background job to release the lock.
    pub async fn wait_idle(&self) {
        self.lifecycle.wait_idle().await;
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body on behalf of `user`.
    pub async fn post_as(&self, user: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(user), Some(body)).await
    }

    /// Send a POST request without body on behalf of `user`.
    pub async fn post_empty_as(&self, user: &str, path: &str) -> TestResponse {
        self.request("POST", path, Some(user), None).await
    }

    /// Send a POST request without the forwarded user header.
    pub async fn post_anonymous(&self, path: &str) -> TestResponse {
        self.request("POST", path, None, None).await
    }

    /// Get the raw text body of a GET request.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(user) = user {
            request_builder = request_builder.header("X-Forwarded-User", user);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
