//! End-to-end: real `tail` followers forwarding to a local HTTP endpoint

use logship::config::{AgentConfig, AnalyzerConfig, MonitoringConfig, ServicesConfig};
use logship::Supervisor;
use mockito::Matcher;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Time for `tail` to open the file before lines are appended
const TAIL_STARTUP: Duration = Duration::from_millis(1000);

fn file_only_config(endpoint: String, dir: &TempDir) -> AgentConfig {
    AgentConfig {
        analyzer: AnalyzerConfig { endpoint },
        monitoring: MonitoringConfig {
            log_paths: vec![format!("{}/*.log", dir.path().display())],
            ..MonitoringConfig::default()
        },
        services: ServicesConfig {
            auto_detect: false,
            docker: false,
            systemd: false,
        },
        ..AgentConfig::default()
    }
}

fn append(path: &Path, line: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(line.as_bytes()).unwrap();
    file.flush().unwrap();
}

#[tokio::test]
async fn error_line_in_file_is_forwarded_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/analyze")
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(serde_json::json!({
                "serviceName": "app",
                "source": "file"
            })),
            Matcher::Regex("2024-01-01 ERROR db timeout".to_string()),
        ]))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("app.log");
    std::fs::write(&log_file, "old line with error before the agent started\n").unwrap();

    let mut supervisor = Supervisor::new(file_only_config(server.url(), &dir)).unwrap();
    assert_eq!(supervisor.start().await, 1);

    tokio::time::sleep(TAIL_STARTUP).await;
    append(&log_file, "2024-01-01 ERROR db timeout\n");

    for _ in 0..50 {
        if mock.matched_async().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    // Give a duplicate the chance to show up before asserting exactly one
    tokio::time::sleep(Duration::from_millis(300)).await;

    supervisor.stop().await;
    mock.assert_async().await;
}

#[tokio::test]
async fn benign_line_in_file_is_not_forwarded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/analyze")
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("worker.log");
    std::fs::write(&log_file, "").unwrap();

    let mut supervisor = Supervisor::new(file_only_config(server.url(), &dir)).unwrap();
    assert_eq!(supervisor.start().await, 1);

    tokio::time::sleep(TAIL_STARTUP).await;
    append(&log_file, "heartbeat ok\n");
    tokio::time::sleep(Duration::from_millis(500)).await;

    supervisor.stop().await;
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_analyzer_does_not_stop_the_agent() {
    let dir = TempDir::new().unwrap();
    let log_file = dir.path().join("api.log");
    std::fs::write(&log_file, "").unwrap();

    let mut config = file_only_config("http://127.0.0.1:1".to_string(), &dir);
    config.delivery.max_retries = 0;
    let mut supervisor = Supervisor::new(config).unwrap();
    assert_eq!(supervisor.start().await, 1);

    tokio::time::sleep(TAIL_STARTUP).await;
    append(&log_file, "fatal: first\n");
    tokio::time::sleep(Duration::from_millis(300)).await;
    append(&log_file, "fatal: second\n");
    tokio::time::sleep(Duration::from_millis(300)).await;

    tokio::time::timeout(Duration::from_secs(10), supervisor.stop())
        .await
        .expect("agent did not stop after delivery failures");
}
