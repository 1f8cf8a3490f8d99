//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use lambda_dev_server::config::DevConfig;
use lambda_dev_server::handler::WasmArtifactLoader;
use lambda_dev_server::{DevServer, HandlerLoader, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running dev server on a loopback port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub loader: Arc<HandlerLoader>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a dev server serving the artifact at `artifact`.
pub async fn start_server(artifact: &Path) -> TestServer {
    let mut config = DevConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.artifact.path = artifact.display().to_string();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let loader = Arc::new(HandlerLoader::new(
        &config.artifact.path,
        Arc::new(WasmArtifactLoader::new()),
    ));
    let shutdown = Shutdown::new();
    let server = DevServer::new(config, loader.clone());
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        loader,
        shutdown,
        task,
    }
}

/// Write bytes as a WAT string literal, escaping every byte.
fn wat_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{:02x}", b)).collect()
}

/// A module whose handler completes with `result_json`.
#[allow(dead_code)]
pub fn succeeding_module(result_json: &str) -> String {
    format!(
        r#"(module
  (import "lambda" "succeed" (func $succeed (param i32 i32)))
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 8192))
  (data (i32.const 0) "{data}")
  (func (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get $len)))
    (local.get $ptr))
  (func (export "handler") (param i32 i32 i32 i32)
    (call $succeed (i32.const 0) (i32.const {len}))))"#,
        data = wat_bytes(result_json.as_bytes()),
        len = result_json.len()
    )
}

/// A module whose handler reports `message` as a failure.
#[allow(dead_code)]
pub fn failing_module(message: &str) -> String {
    format!(
        r#"(module
  (import "lambda" "fail" (func $fail (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "{data}")
  (func (export "alloc") (param i32) (result i32) (i32.const 8192))
  (func (export "handler") (param i32 i32 i32 i32)
    (call $fail (i32.const 0) (i32.const {len}))))"#,
        data = wat_bytes(message.as_bytes()),
        len = message.len()
    )
}

/// Write `source` to `path` and stamp it with a distinct modification time.
#[allow(dead_code)]
pub fn write_artifact(path: &Path, source: &str, generation: u64) {
    std::fs::write(path, source).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + generation))
        .unwrap();
}
