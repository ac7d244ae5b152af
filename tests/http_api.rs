use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::{sync::Notify, task::JoinHandle};
use waldiez_server::{
    config::{AppState, Config},
    export::{ExportError, FlowExporter},
    server,
};

const BOUNDARY: &str = "c0ffee0ddba11";

/// Writes a stub script next to the flow instead of calling the real CLI
struct StubExporter;

#[async_trait]
impl FlowExporter for StubExporter {
    async fn export(&self, source: &Path, output: &Path, _force: bool) -> Result<(), ExportError> {
        let flow = tokio::fs::read_to_string(source)
            .await
            .expect("flow should be readable");
        if flow.contains("broken") {
            return Err(ExportError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "invalid flow".to_string(),
            });
        }
        tokio::fs::write(output, format!("# generated from {}\n", source.display()))
            .await
            .expect("output should be writable");
        Ok(())
    }
}

struct TestServer {
    addr: SocketAddr,
    root: TempDir,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    fn root(&self) -> PathBuf {
        self.root.path().canonicalize().expect("root should exist")
    }

    /// Callers drop their clients first so pooled connections do not hold up draining
    async fn stop(self) {
        self.shutdown.notify_one();
        self.handle.await.expect("server task should finish");
    }
}

/// Takes longer than the configured read and write timeouts
struct SlowExporter(Duration);

#[async_trait]
impl FlowExporter for SlowExporter {
    async fn export(&self, _source: &Path, output: &Path, _force: bool) -> Result<(), ExportError> {
        tokio::time::sleep(self.0).await;
        tokio::fs::write(output, "# slow\n")
            .await
            .expect("output should be writable");
        Ok(())
    }
}

async fn spawn_server(base_url: &str) -> TestServer {
    spawn_server_with(base_url, Arc::new(StubExporter), |_| {}).await
}

async fn spawn_server_with(
    base_url: &str,
    exporter: Arc<dyn FlowExporter>,
    configure: impl FnOnce(&mut Config),
) -> TestServer {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let root_path = root.path().canonicalize().expect("root should exist");

    let mut config = Config::load_from("no-such-config").expect("defaults should load");
    config.server.base_url = base_url.to_string();
    config.server.root_dir = root_path.display().to_string();
    config.assets.static_dir = root_path.join("static").display().to_string();
    config.logging.access_log = false;
    configure(&mut config);

    let mut state = AppState::new(&config, exporter).expect("state should build");
    state.cwd = root_path;

    let listener = server::create_reusable_listener("127.0.0.1:0".parse().expect("valid addr"))
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have addr");
    let shutdown = Arc::new(Notify::new());
    let server_shutdown = Arc::clone(&shutdown);
    let handle = tokio::spawn(async move {
        server::run(listener, Arc::new(state), server_shutdown)
            .await
            .expect("server should run");
    });

    TestServer {
        addr,
        root,
        shutdown,
        handle,
    }
}

fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn files_endpoint_resolves_paths() {
    let server = spawn_server("/").await;
    std::fs::write(server.root().join("flow.waldiez"), "{}").expect("flow should be written");
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("waldiez/files"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 400);

    let response = client
        .get(server.url("waldiez/files?path=missing.waldiez"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("error body should be json");
    assert_eq!(body["reason"], "File not found: missing.waldiez");

    let response = client
        .get(server.url("waldiez/files?path=flow.waldiez"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("body should be json");
    assert_eq!(
        body["path"],
        server.root().join("flow.waldiez").display().to_string()
    );

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn files_endpoint_exports_flows() {
    let server = spawn_server("/user/jovyan").await;
    let root = server.root();
    std::fs::write(root.join("good.waldiez"), "{}").expect("flow should be written");
    std::fs::write(root.join("bad.waldiez"), "broken").expect("flow should be written");
    std::fs::write(root.join("notes.txt"), "x").expect("file should be written");
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("user/jovyan/waldiez/files"))
        .json(&json!({
            "files": ["good.waldiez", "bad.waldiez", "notes.txt"],
            "extension": "py"
        }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("body should be json");
    assert_eq!(body, json!({ "files": ["good.py"] }));
    assert!(root.join("good.py").exists());
    assert!(!root.join("bad.py").exists());

    let response = client
        .post(server.url("user/jovyan/waldiez/files"))
        .json(&json!({ "files": ["good.waldiez"], "extension": "invalid" }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("error body should be json");
    assert_eq!(body["reason"], "Invalid extension");

    let response = client
        .post(server.url("user/jovyan/waldiez/files"))
        .json(&json!({ "files": ["notes.txt"], "extension": "ipynb" }))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 400);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn upload_endpoint_filters_extensions() {
    let server = spawn_server("/").await;
    let client = reqwest::Client::new();
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

    let response = client
        .post(server.url("waldiez/upload"))
        .header("content-type", &content_type)
        .body(multipart_body("dummy.txt", "text/plain", b"dummy"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("body should be json");
    let destination = server.root().join("dummy.txt");
    assert_eq!(body["path"], destination.display().to_string());
    assert_eq!(
        std::fs::read_to_string(&destination).expect("upload should be stored"),
        "dummy"
    );

    let response = client
        .post(server.url("waldiez/upload"))
        .header("content-type", &content_type)
        .body(multipart_body("blank.png", "image/png", &[0x89, b'P', b'N', b'G']))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("error body should be json");
    assert_eq!(body["reason"], "File extension not allowed");

    let response = client
        .post(server.url("waldiez/upload"))
        .body("")
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 400);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn static_assets_are_served() {
    let server = spawn_server("/").await;
    let static_dir = server.root().join("static");
    std::fs::create_dir_all(static_dir.join("vs")).expect("static dir should be created");
    std::fs::create_dir_all(static_dir.join("min-maps/vs")).expect("maps dir should be created");
    std::fs::write(static_dir.join("vs/loader.js"), "define()").expect("loader should be written");
    std::fs::write(static_dir.join("min-maps/vs/loader.js.map"), "{}")
        .expect("map should be written");
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("static/vs/loader.js"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 200);
    let etag = response
        .headers()
        .get("etag")
        .expect("etag should be set")
        .clone();
    assert_eq!(response.text().await.expect("body should be text"), "define()");

    let response = client
        .get(server.url("static/vs/loader.js"))
        .header("if-none-match", etag)
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 304);

    let response = client
        .get(server.url("min-maps/vs/loader.js.map"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");

    let response = client
        .get(server.url("healthz"))
        .send()
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 200);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn slow_export_outlives_read_and_write_timeouts() {
    let server = spawn_server_with(
        "/",
        Arc::new(SlowExporter(Duration::from_millis(2500))),
        |config| {
            config.performance.read_timeout = 1;
            config.performance.write_timeout = 1;
        },
    )
    .await;
    std::fs::write(server.root().join("flow.waldiez"), "{}").expect("flow should be written");
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("waldiez/files"))
        .json(&json!({ "files": ["flow.waldiez"], "extension": "py" }))
        .send()
        .await
        .expect("slow export should still be answered");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("body should be json");
    assert_eq!(body, json!({ "files": ["flow.py"] }));

    drop(client);
    server.stop().await;
}
