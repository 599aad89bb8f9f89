use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config rooted in `root`
fn minimal_config(port: u16, root: &std::path::Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[database]
path = "{root}/statif.db"

[paths]
static_repository = "{root}/static"
visualize_repository = "{root}/visualize"
archive_repository = "{root}/archive"
log_dir = "{root}/log"
log_file = "{root}/log/statif.log"
lock_file = "{root}/.lock_access"
status_file = "{root}/statusBackground.json"
pid_file = "{root}/.pid.data"
progress_counter_file = "{root}/.crawlerProgressCounterFile.txt"

[crawler]
program = "/bin/true"

[deploy]
script = "/bin/true"
shell = "sh"
"#,
        port = port,
        root = root.display()
    )
}

/// Temporary root holding the repositories the server expects at startup.
fn repository_root() -> TempDir {
    let root = TempDir::new().unwrap();
    for dir in ["static", "visualize", "archive"] {
        std::fs::create_dir_all(root.path().join(dir)).unwrap();
    }
    root
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_statif"))
        .env("STATIF_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_and_status_endpoints() {
    let root = repository_root();
    let port = get_available_port();
    let temp_file = write_config(&minimal_config(port, root.path()));

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/statifications/status", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "production");
    assert_eq!(json["locked"], false);

    // Lock file and log directory created on startup
    assert!(root.path().join(".lock_access").exists());
    assert!(root.path().join("log").is_dir());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let root = repository_root();
    let port = get_available_port();
    let temp_file = write_config(&minimal_config(port, root.path()));

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["deploy"]["shell"], "sh");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_statif"))
            .env("STATIF_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_crawler_section_exits_with_error() {
    let config_without_crawler = r#"
[server]
port = 8080

[deploy]
script = "/bin/true"
"#;
    let temp_file = write_config(config_without_crawler);

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_statif"))
            .env("STATIF_CONFIG", temp_file.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_archive_repository_exits_with_error() {
    let root = repository_root();
    std::fs::remove_dir(root.path().join("archive")).unwrap();
    let temp_file = write_config(&minimal_config(get_available_port(), root.path()));

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_statif"))
            .env("STATIF_CONFIG", temp_file.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
    assert!(!root.path().join(".lock_access").exists());
}
