//! Client end of the bridge.
//!
//! Spawns the server as a subprocess, issues requests with monotonically
//! increasing ids, and multiplexes the single inbound stream into "the
//! response I'm waiting for" versus "notifications to log".
//!
//! Only one call is ever outstanding at a time. A response carrying any
//! other id is logged and discarded, not queued — safe under the
//! single-outstanding-call constraint, but concurrent calls would need a
//! real id-to-waiter map instead.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::handlers::PROTOCOL_VERSION;
use crate::protocol::{Message, RpcError, RpcId, ToolResult};
use crate::transport::{encode_message, FrameError, Framing, MessageReader};

/// Default per-call wait for a matching response.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period between closing the server's stdin and killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to spawn server process: {0}")]
    Spawn(std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("no response to {method:?} (id {id}) within {timeout:?}")]
    Timeout {
        id: i64,
        method: String,
        timeout: Duration,
    },
    #[error("connection closed before a response to id {id} arrived")]
    Closed { id: i64 },
    #[error("server stdin is closed")]
    Disconnected,
    #[error("server returned error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),
}

/// The correlated reply to a call: either the result payload or the
/// protocol-level error object, both known to carry the call's id.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Result(Value),
    Error(RpcError),
}

impl Reply {
    /// Unwrap the result payload, turning a protocol error into `Rpc`.
    pub fn into_result(self) -> Result<Value, ClientError> {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(error) => Err(ClientError::Rpc(error)),
        }
    }
}

/// Book-keeping for the one call allowed in flight.
#[derive(Debug, Clone, Copy)]
pub struct PendingCall {
    pub id: i64,
    pub submitted_at: Instant,
}

/// Owns the server subprocess and correlates responses to requests by id.
pub struct BridgeClient {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: MessageReader<BufReader<ChildStdout>>,
    next_id: i64,
    pending: Option<PendingCall>,
}

impl BridgeClient {
    /// Spawn `program args…` with piped stdio and start draining its
    /// stderr on a detached task, so diagnostics never back-pressure the
    /// protocol path. The drain ends when the stderr stream closes.
    pub fn spawn<I, S>(
        program: &str,
        args: I,
        envs: &[(String, String)],
    ) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in envs {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(ClientError::Spawn)?;
        let stdin = child.stdin.take().expect("child stdin was piped");
        let stdout = child.stdout.take().expect("child stdout was piped");
        let stderr = child.stderr.take().expect("child stderr was piped");

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "server_stderr", "{line}");
            }
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            reader: MessageReader::new(BufReader::new(stdout)),
            next_id: 0,
            pending: None,
        })
    }

    /// The call currently awaiting its response, if any.
    pub fn pending_call(&self) -> Option<PendingCall> {
        self.pending
    }

    /// Issue a request and wait for the reply carrying its id.
    ///
    /// Ids are assigned monotonically starting at 1 and never reused
    /// within a session. Notifications received while waiting are logged;
    /// messages with any other id are logged and discarded.
    pub async fn call(
        &mut self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Reply, ClientError> {
        self.next_id += 1;
        let id = self.next_id;
        self.pending = Some(PendingCall {
            id,
            submitted_at: Instant::now(),
        });

        let outcome = self.call_inner(id, method, params, timeout).await;
        self.pending = None;
        outcome
    }

    async fn call_inner(
        &mut self,
        id: i64,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Reply, ClientError> {
        let request = Message::request(RpcId::Number(id), method, params);
        self.send(&request).await?;
        debug!(method, id, "request sent");

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout {
                    id,
                    method: method.to_string(),
                    timeout,
                });
            }

            let decoded = match tokio::time::timeout(remaining, self.reader.next_message()).await
            {
                Err(_) => {
                    return Err(ClientError::Timeout {
                        id,
                        method: method.to_string(),
                        timeout,
                    });
                }
                Ok(Ok(None)) => return Err(ClientError::Closed { id }),
                Ok(Ok(Some(message))) => message,
                Ok(Err(e)) if e.is_fatal() => return Err(e.into()),
                Ok(Err(e)) => {
                    warn!(error = %e, "dropping undecodable frame");
                    continue;
                }
            };

            match decoded {
                Message::Response(r) if r.id == RpcId::Number(id) => {
                    return Ok(Reply::Result(r.result));
                }
                Message::Error(e) if e.id == Some(RpcId::Number(id)) => {
                    return Ok(Reply::Error(e.error));
                }
                Message::Notification(n) => {
                    info!(method = %n.method, "notification from server");
                }
                other => {
                    warn!(id = ?other.id(), "discarding message with unexpected id");
                }
            }
        }
    }

    /// Send a notification (no id, so no reply will ever come).
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let note = Message::notification(method, params);
        self.send(&note).await
    }

    /// Handshake: `initialize`, then the initialized notification.
    pub async fn initialize(&mut self, timeout: Duration) -> Result<Value, ClientError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "bridge-client",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let result = self
            .call("initialize", Some(params), timeout)
            .await?
            .into_result()?;
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    /// Invoke a named tool and decode its content-list result.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<ToolResult, ClientError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self
            .call("tools/call", Some(params), timeout)
            .await?
            .into_result()?;
        Ok(serde_json::from_value(result).map_err(FrameError::from)?)
    }

    /// Close the server's stdin and wait for exit, escalating to a kill
    /// after a bounded grace period. Never waits unboundedly.
    pub async fn shutdown(mut self) -> Result<ExitStatus, ClientError> {
        drop(self.stdin.take());
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!("server did not exit within grace period, killing it");
                self.child.kill().await?;
                Ok(self.child.wait().await?)
            }
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        let bytes = encode_message(message, Framing::Header).map_err(FrameError::from)?;
        let stdin = self.stdin.as_mut().ok_or(ClientError::Disconnected)?;
        stdin.write_all(&bytes).await?;
        stdin.flush().await?;
        Ok(())
    }
}
