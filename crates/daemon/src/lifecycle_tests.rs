use super::*;

fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        host: "127.0.0.1".to_string(),
        port: 0,
        poll_interval: std::time::Duration::from_millis(50),
        worker_idle_timeout: std::time::Duration::from_secs(60),
        max_retries: 3,
        resource_threshold: 50,
    }
}

#[tokio::test]
async fn start_binds_an_ephemeral_port_and_writes_the_discovery_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let daemon = Daemon::start(config.clone(), "true".to_string())
        .await
        .unwrap();

    assert!(daemon.local_addr.port() > 0);
    assert!(config.lock_path().exists());

    let record = discovery::read(&config.discovery_path()).expect("discovery file readable");
    assert_eq!(record.port, daemon.local_addr.port());
    assert_eq!(record.pid, std::process::id());

    daemon.shutdown().await;
    assert!(!config.discovery_path().exists());
}

#[tokio::test]
async fn a_second_start_against_the_same_data_dir_fails_to_acquire_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let daemon = Daemon::start(config.clone(), "true".to_string())
        .await
        .unwrap();

    let second = Daemon::start(test_config(&dir), "true".to_string()).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

    daemon.shutdown().await;
}

#[tokio::test]
async fn health_endpoint_reports_zero_agents_on_a_fresh_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let daemon = Daemon::start(config, "true".to_string()).await.unwrap();

    let url = format!("http://{}/health", daemon.local_addr);
    let body: serde_json::Value = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(body["agents"], 0);
    assert_eq!(body["pid"], std::process::id());

    daemon.shutdown().await;
}

#[tokio::test]
async fn shutdown_endpoint_requests_graceful_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let daemon = Daemon::start(config, "true".to_string()).await.unwrap();
    let shutdown = daemon.state.shutdown.clone();

    let url = format!("http://{}/shutdown", daemon.local_addr);
    let response = reqwest::Client::new().post(url).send().await.unwrap();
    assert!(response.status().is_success());

    tokio::time::timeout(std::time::Duration::from_secs(1), shutdown.notified())
        .await
        .expect("shutdown should have been notified already");

    daemon.shutdown().await;
}
