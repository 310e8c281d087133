use serde_json::{json, Value};
use shmlink::{server, ServerConfig, SocketServer};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Running {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    _dir: tempfile::TempDir,
}

impl Running {
    fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("server.sock");
        let server = SocketServer::bind(ServerConfig {
            socket_path: path.clone(),
            ..ServerConfig::default()
        })
        .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || server.serve(&flag).unwrap());

        Self {
            path,
            stop,
            handle: Some(handle),
            _dir: dir,
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn exchange(stream: &mut UnixStream, request: &[u8]) -> Value {
    stream.write_all(request).unwrap();
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).unwrap();
    serde_json::from_slice(&buf[..n]).unwrap()
}

#[test]
fn test_doubles_data() {
    let running = Running::start();
    let reply: Value = server::request(&running.path, &json!({"data": 5})).unwrap();
    assert_eq!(reply, json!({"status": "success", "data": 10}));
}

#[test]
fn test_missing_data_is_reported() {
    let running = Running::start();
    let reply: Value = server::request(&running.path, &json!({"value": 5})).unwrap();

    assert_eq!(reply["status"], "error");
    let message = reply["message"].as_str().unwrap();
    assert!(message.contains("data"), "{message}");
}

#[test]
fn test_connection_stays_open_between_requests() {
    let running = Running::start();
    let mut stream = UnixStream::connect(&running.path).unwrap();

    assert_eq!(
        exchange(&mut stream, br#"{"data": 1}"#),
        json!({"status": "success", "data": 2})
    );
    // An error reply does not end the connection
    assert_eq!(exchange(&mut stream, b"not json")["status"], "error");
    assert_eq!(
        exchange(&mut stream, br#"{"data": 2.5}"#),
        json!({"status": "success", "data": 5.0})
    );
}

#[test]
fn test_serves_connections_one_after_another() {
    let running = Running::start();
    for n in 0..3 {
        let reply: Value = server::request(&running.path, &json!({"data": n})).unwrap();
        assert_eq!(reply["data"], n * 2);
    }
}

#[test]
fn test_shutdown_removes_socket_file() {
    let mut running = Running::start();
    assert!(running.path.exists());
    running.shutdown();
    assert!(!running.path.exists());
}

#[test]
fn test_bind_replaces_stale_socket_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.sock");
    std::fs::write(&path, b"left over").unwrap();

    let server = SocketServer::bind(ServerConfig {
        socket_path: path.clone(),
        ..ServerConfig::default()
    })
    .unwrap();
    assert_eq!(server.socket_path(), path.as_path());
}

#[test]
fn test_request_without_server_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result: shmlink::Result<Value> = server::request(dir.path().join("nobody.sock"), &json!({"data": 1}));
    assert!(matches!(result, Err(shmlink::ShmLinkError::Io(_))));
}
