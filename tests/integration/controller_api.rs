//! Live control endpoint tests
//!
//! Starts the real server on a loopback port and talks to it over HTTP.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serial_test::serial;

use clash_bridge::common::allocate_free_port;
use clash_bridge::config::{ConfigLoader, YamlLoader};
use clash_bridge::controller::{start_controller, ControllerConfig, ControllerState};
use clash_bridge::engine::{Engine, InMemoryEngine};

const SECRET: &str = "test-controller-secret";

struct TestServer {
    base_url: String,
    engine: Arc<InMemoryEngine>,
    home: tempfile::TempDir,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn setup_test_server(secret: &str) -> TestServer {
    let home = tempfile::tempdir().unwrap();
    let config_path = home.path().join("config.yaml");
    fs::write(&config_path, "port: 7890\nmode: direct\nproxies:\n  - { name: base, type: ss }\n").unwrap();

    let ui_dir = home.path().join("ui");
    fs::create_dir_all(&ui_dir).unwrap();
    fs::write(ui_dir.join("index.html"), "<h1>dashboard</h1>").unwrap();

    let engine = Arc::new(InMemoryEngine::new());
    engine
        .apply(YamlLoader::new().parse_path(&config_path).unwrap(), true)
        .unwrap();

    let port = allocate_free_port().unwrap();
    let listen_addr = format!("127.0.0.1:{}", port);
    let state = ControllerState {
        engine: engine.clone(),
        loader: Arc::new(YamlLoader::new()),
        config_path,
        guard: Arc::new(Mutex::new(())),
    };
    let config = ControllerConfig {
        listen_addr: listen_addr.clone(),
        secret: secret.to_string(),
        ui_path: Some(ui_dir),
    };

    let task = tokio::spawn(async move {
        start_controller(config, state).await.expect("controller failed");
    });

    let base_url = format!("http://{}", listen_addr);
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(&listen_addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    TestServer { base_url, engine, home, task }
}

async fn make_request(
    base_url: &str,
    endpoint: &str,
    method: &str,
    secret: Option<&str>,
    body: Option<serde_json::Value>,
) -> Result<reqwest::Response, reqwest::Error> {
    let client = reqwest::Client::new();
    let url = format!("{}{}", base_url, endpoint);

    let mut builder = match method {
        "GET" => client.get(&url),
        "PUT" => client.put(&url),
        "PATCH" => client.patch(&url),
        _ => panic!("Unsupported HTTP method"),
    };

    if let Some(secret) = secret {
        builder = builder.header("Authorization", format!("Bearer {}", secret));
    }

    if let Some(json) = body {
        builder = builder.json(&json);
    }

    builder.send().await
}

#[tokio::test]
#[serial]
async fn test_requires_secret() {
    let server = setup_test_server(SECRET).await;

    let response = make_request(&server.base_url, "/configs", "GET", None, None).await.unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized");

    let response = make_request(&server.base_url, "/configs", "GET", Some("wrong"), None).await.unwrap();
    assert_eq!(response.status(), 401);

    let response = make_request(&server.base_url, "/configs", "GET", Some(SECRET), None).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["port"], 7890);
    assert_eq!(body["mode"], "direct");
}

#[tokio::test]
#[serial]
async fn test_version_and_hello() {
    let server = setup_test_server("").await;

    let body: serde_json::Value = make_request(&server.base_url, "/", "GET", None, None)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["hello"], "clash");

    let body: serde_json::Value = make_request(&server.base_url, "/version", "GET", None, None)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["version"], clash_bridge::VERSION);
}

#[tokio::test]
#[serial]
async fn test_put_configs_from_path() {
    let server = setup_test_server(SECRET).await;
    let update = server.home.path().join("update.yaml");
    fs::write(&update, "port: 7000\nproxies:\n  - { name: other, type: trojan }\n").unwrap();

    let body = serde_json::json!({ "path": update.to_string_lossy() });
    let response = make_request(&server.base_url, "/configs", "PUT", Some(SECRET), Some(body)).await.unwrap();
    assert_eq!(response.status(), 204);

    assert_eq!(server.engine.general().port, 7000);
    assert_eq!(server.engine.generation(), 2);
    let names: Vec<String> = server.engine.proxies().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["other".to_string()]);
}

#[tokio::test]
#[serial]
async fn test_put_configs_reports_parse_errors() {
    let server = setup_test_server("").await;

    let body = serde_json::json!({ "payload": "proxy-groups:\n  - { name: g, type: select, proxies: [ghost] }\n" });
    let response = make_request(&server.base_url, "/configs", "PUT", None, Some(body)).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("ghost"));
    assert_eq!(server.engine.generation(), 1);
}

#[tokio::test]
#[serial]
async fn test_patch_configs() {
    let server = setup_test_server("").await;

    let body = serde_json::json!({ "mode": "rule", "allow-lan": true });
    let response = make_request(&server.base_url, "/configs", "PATCH", None, Some(body)).await.unwrap();
    assert_eq!(response.status(), 204);

    let general = server.engine.general();
    assert_eq!(general.mode, clash_bridge::config::Mode::Rule);
    assert!(general.allow_lan);
}

#[tokio::test]
#[serial]
async fn test_serves_ui_without_secret() {
    let server = setup_test_server(SECRET).await;

    let response = make_request(&server.base_url, "/ui/index.html", "GET", None, None).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "<h1>dashboard</h1>");

    let missing: PathBuf = server.home.path().join("ui").join("missing.html");
    assert!(!missing.exists());
    let response = make_request(&server.base_url, "/ui/missing.html", "GET", None, None).await.unwrap();
    assert_eq!(response.status(), 404);
}
