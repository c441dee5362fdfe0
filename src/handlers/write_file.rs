use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::info;

use crate::protocol::ToolResult;
use crate::registry::{ToolArgs, ToolContext, ToolDescriptor};
use crate::sandbox::SandboxError;

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "write_file".into(),
        description: "Write content to a file in the sandbox directory".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["filename", "content"]
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
    let content = args.get("content").and_then(Value::as_str).unwrap_or_default();

    let path = match ctx.sandbox.resolve_writable(filename) {
        Ok(p) => p,
        Err(SandboxError::Escape) => {
            return ToolResult::error(
                "Error: Invalid filename. File must be in sandbox directory.",
            );
        }
        Err(_) => return ToolResult::error("Error: Invalid filename path"),
    };

    match std::fs::write(&path, content) {
        Ok(()) => {
            let written = content.chars().count();
            info!(file = %path.display(), chars = written, "wrote file");
            ToolResult::text(format!(
                "Successfully wrote {written} characters to {filename}"
            ))
        }
        Err(e) => ToolResult::error(format!("Error writing file: {e}")),
    }
}
