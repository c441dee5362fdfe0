pub mod list_files;
pub mod read_file;
pub mod relay;
pub mod write_file;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::protocol::{
    InitializeParams, Message, Notification, Request, RpcError, ToolCallParams,
};
use crate::registry::{ToolContext, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Assemble the capability set for a server instance.
///
/// The relay variant is the same server with three extra mailbox
/// capabilities, not a separate implementation — everything else (framing,
/// sandbox confinement, file tools) is shared.
pub fn default_registry(config: &ServerConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(write_file::descriptor(), write_file::handler);
    registry.register(read_file::descriptor(), read_file::handler);
    registry.register(list_files::descriptor(), list_files::handler);
    if config.relay_tools {
        registry.register(relay::write_descriptor(), relay::write_handler);
        registry.register(relay::read_descriptor(), relay::read_handler);
        registry.register(relay::status_descriptor(), relay::status_handler);
    }
    registry
}

/// Dispatch a request to the appropriate handler.
///
/// Every request yields exactly one reply carrying the request's id.
/// Tool-level failures surface inside a *successful* reply as error-flavored
/// content; only protocol failures (unknown method, malformed params,
/// handler breakage) become error replies.
pub async fn dispatch(req: &Request, registry: &ToolRegistry, ctx: &ToolContext) -> Message {
    match req.method.as_str() {
        "initialize" => {
            if let Some(client) = client_info(req) {
                debug!(
                    name = client.name.as_deref().unwrap_or("unknown"),
                    version = client.version.as_deref().unwrap_or("unknown"),
                    "client identified"
                );
            }
            let result = json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            Message::success(req.id.clone(), result)
        }

        "ping" => Message::success(req.id.clone(), json!({})),

        "tools/list" => {
            let tools: Vec<_> = registry.descriptors().collect();
            Message::success(req.id.clone(), json!({ "tools": tools }))
        }

        // Prompts and resources are unsupported; empty sets let generic
        // clients probe without tripping method-not-found.
        "prompts/list" => Message::success(req.id.clone(), json!({ "prompts": [] })),
        "resources/list" => Message::success(req.id.clone(), json!({ "resources": [] })),

        "tools/call" => {
            let params: ToolCallParams = match &req.params {
                Some(v) => match serde_json::from_value(v.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        return Message::error(
                            Some(req.id.clone()),
                            RpcError::invalid_params(format!("Invalid tools/call params: {e}")),
                        );
                    }
                },
                None => {
                    return Message::error(
                        Some(req.id.clone()),
                        RpcError::invalid_params("Missing params for tools/call"),
                    );
                }
            };

            let tool_result = registry.invoke(&params.name, params.arguments, ctx).await;
            match serde_json::to_value(&tool_result) {
                Ok(result) => Message::success(req.id.clone(), result),
                Err(e) => Message::error(Some(req.id.clone()), RpcError::internal(e.to_string())),
            }
        }

        _ => Message::error(
            Some(req.id.clone()),
            RpcError::method_not_found(&req.method),
        ),
    }
}

/// Notifications change server state at most; they never produce a reply,
/// regardless of outcome. Returns the new readiness value.
pub fn handle_notification(note: &Notification, ready: bool) -> bool {
    match note.method.as_str() {
        "initialized" | "notifications/initialized" => {
            debug!("client reported initialization complete");
            true
        }
        other => {
            warn!(method = other, "ignoring unknown notification");
            ready
        }
    }
}

fn client_info(req: &Request) -> Option<crate::protocol::ClientInfo> {
    let params = req.params.clone()?;
    let init: InitializeParams = serde_json::from_value(params).ok()?;
    init.client_info
}
