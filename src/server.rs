//! Unix domain socket request/response server
//!
//! Each read on a connection is one request: a JSON object with a numeric
//! `data` field. The reply is one JSON document:
//!
//! ```text
//! {"status": "success", "data": <data * 2>}
//! {"status": "error", "message": "<what went wrong>"}
//! ```
//!
//! Connections are served one at a time and stay open until the peer closes.

use crate::config::ServerConfig;
use crate::error::{Result, ShmLinkError};
use crate::frame;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Number;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long `accept` backs off when no client is waiting
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// How often a blocked connection read checks for shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Largest reply the client helper reads
const MAX_RESPONSE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct Request {
    data: Number,
}

/// Reply sent for every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success { data: Number },
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

/// Turn one raw request into its reply
pub fn handle_request(bytes: &[u8]) -> Response {
    let request: Request = match serde_json::from_slice(bytes) {
        Ok(request) => request,
        Err(e) => return Response::error(format!("invalid request: {e}")),
    };

    match double(&request.data) {
        Some(data) => Response::Success { data },
        None => Response::error(format!("data {} cannot be doubled", request.data)),
    }
}

fn double(n: &Number) -> Option<Number> {
    if let Some(i) = n.as_i64() {
        return i.checked_mul(2).map(Number::from);
    }
    if let Some(u) = n.as_u64() {
        return u.checked_mul(2).map(Number::from);
    }
    n.as_f64().and_then(|f| Number::from_f64(f * 2.0))
}

/// Request/response server on a Unix domain socket
pub struct SocketServer {
    listener: UnixListener,
    config: ServerConfig,
}

impl SocketServer {
    /// Bind the socket, replacing a stale socket file if one exists
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let path = config.socket_path.as_path();

        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;

        tracing::info!(path = %path.display(), "socket server listening");
        Ok(Self { listener, config })
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Accept and serve connections until `stop` is set
    pub fn serve(&self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if let Err(e) = self.handle_connection(stream, stop) {
                        tracing::warn!(error = %e, "connection ended with error");
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(ACCEPT_BACKOFF),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(path = %self.socket_path().display(), "socket server stopping");
        Ok(())
    }

    fn handle_connection(&self, mut stream: UnixStream, stop: &AtomicBool) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        tracing::debug!("client connected");

        let mut buf = vec![0u8; self.config.max_request];
        while !stop.load(Ordering::SeqCst) {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let response = handle_request(&buf[..n]);
            match &response {
                Response::Success { data } => tracing::debug!(%data, "request handled"),
                Response::Error { message } => tracing::warn!(%message, "request failed"),
            }

            let bytes = serde_json::to_vec(&response).map_err(ShmLinkError::Encode)?;
            stream.write_all(&bytes)?;
        }

        tracing::debug!("client disconnected");
        Ok(())
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.config.socket_path);
    }
}

/// Send one request to a server and wait for its reply
pub fn request<Req, Resp>(path: impl AsRef<Path>, payload: &Req) -> Result<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let mut stream = UnixStream::connect(path)?;
    let bytes = serde_json::to_vec(payload).map_err(ShmLinkError::Encode)?;
    stream.write_all(&bytes)?;

    let mut buf = vec![0u8; MAX_RESPONSE];
    let n = stream.read(&mut buf)?;
    if n == 0 {
        return Err(ShmLinkError::Io(ErrorKind::UnexpectedEof.into()));
    }
    frame::decode_payload(&buf[..n])
}
