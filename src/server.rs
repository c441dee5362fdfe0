use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::handlers;
use crate::protocol::{Message, RpcError};
use crate::registry::{ToolContext, ToolRegistry};
use crate::sandbox::Sandbox;
use crate::transport::{write_message, MessageReader};

/// Stdio JSON-RPC server.
///
/// Fully synchronous cooperative loop: one message is decoded, dispatched,
/// and replied to before the next is read. With a single logical thread of
/// control, the sandbox contents and the registry need no locking.
pub struct BridgeServer {
    config: ServerConfig,
    registry: ToolRegistry,
    ctx: ToolContext,
    ready: bool,
}

impl BridgeServer {
    /// Establish the sandbox boundary and assemble the capability set.
    pub fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let sandbox = Sandbox::create(&config.sandbox_root)?;
        info!(root = %sandbox.root().display(), "sandbox directory ready");

        if config.relay_tools {
            handlers::relay::ensure_mailbox(&sandbox)?;
            info!("relay mailbox ready");
        }

        let registry = handlers::default_registry(&config);
        Ok(Self {
            config,
            registry,
            ctx: ToolContext { sandbox },
            ready: false,
        })
    }

    /// Run over process stdio until the peer closes the stream.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Read-dispatch-write cycle over arbitrary streams.
    ///
    /// Ends cleanly when the input stream closes. A single undecodable
    /// frame is logged and dropped; only an unusable stream stops the loop
    /// with an error.
    pub async fn serve<R, W>(
        &mut self,
        reader: R,
        mut writer: W,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = MessageReader::new(reader);

        loop {
            let message = match reader.next_message().await {
                Ok(Some(m)) => m,
                Ok(None) => {
                    info!("input stream closed, shutting down");
                    break;
                }
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "input stream unusable");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, "dropping undecodable frame");
                    continue;
                }
            };

            match message {
                Message::Request(req) => {
                    let reply = if req.jsonrpc == "2.0" {
                        debug!(method = %req.method, "dispatching request");
                        handlers::dispatch(&req, &self.registry, &self.ctx).await
                    } else {
                        Message::error(Some(req.id.clone()), RpcError::invalid_request())
                    };
                    write_message(&mut writer, &reply, self.config.framing).await?;
                }
                Message::Notification(note) => {
                    // Straight back to reading — notifications never reply.
                    self.ready = handlers::handle_notification(&note, self.ready);
                }
                Message::Response(_) | Message::Error(_) => {
                    warn!("ignoring unexpected response on server input");
                }
            }
        }

        Ok(())
    }
}
