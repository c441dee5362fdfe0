use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::info;

use crate::protocol::ToolResult;
use crate::registry::{ToolArgs, ToolContext, ToolDescriptor};
use crate::sandbox::SandboxError;

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "read_file".into(),
        description: "Read content from a file in the sandbox directory".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the file to read"
                }
            },
            "required": ["filename"]
        }),
    }
}

pub fn handler(ctx: &ToolContext, args: ToolArgs) -> BoxFuture<'_, ToolResult> {
    Box::pin(handle(ctx, args))
}

pub async fn handle(ctx: &ToolContext, args: ToolArgs) -> ToolResult {
    let Some(filename) = args.get("filename").and_then(Value::as_str) else {
        return ToolResult::error("Error: filename is required");
    };

    let path = match ctx.sandbox.resolve_existing(filename) {
        Ok(p) => p,
        Err(SandboxError::NotFound) => {
            return ToolResult::error(format!("Error: File '{filename}' not found"));
        }
        Err(SandboxError::Escape) => {
            return ToolResult::error(
                "Error: Invalid filename. File must be in sandbox directory.",
            );
        }
        Err(_) => return ToolResult::error("Error: Invalid filename path"),
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            info!(file = %path.display(), chars = content.chars().count(), "read file");
            ToolResult::text(content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ToolResult::error(format!("Error: File '{filename}' not found"))
        }
        Err(e) => ToolResult::error(format!("Error reading file: {e}")),
    }
}
