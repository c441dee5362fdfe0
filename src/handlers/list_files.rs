use futures::future::BoxFuture;
use serde_json::json;
use tracing::info;

use crate::protocol::ToolResult;
use crate::registry::{ToolArgs, ToolContext, ToolDescriptor};

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "list_files".into(),
        description: "List all files in the sandbox directory".into(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn handler(ctx: &ToolContext, args: ToolArgs) -> BoxFuture<'_, ToolResult> {
    Box::pin(handle(ctx, args))
}

/// Enumerates regular files directly under the boundary; subdirectories
/// and anything reached through them are not listed. Output is sorted for
/// a stable listing.
pub async fn handle(ctx: &ToolContext, _args: ToolArgs) -> ToolResult {
    let entries = match std::fs::read_dir(ctx.sandbox.root()) {
        Ok(entries) => entries,
        Err(e) => return ToolResult::error(format!("Error listing files: {e}")),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return ToolResult::error(format!("Error listing files: {e}")),
        };
        match entry.file_type() {
            Ok(kind) if kind.is_file() => {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(_) => {}
            Err(e) => return ToolResult::error(format!("Error listing files: {e}")),
        }
    }

    files.sort();
    info!(count = files.len(), "listed sandbox files");

    if files.is_empty() {
        ToolResult::text("No files in sandbox directory yet")
    } else {
        let listing = files
            .iter()
            .map(|f| format!("- {f}"))
            .collect::<Vec<_>>()
            .join("\n");
        ToolResult::text(format!("Files in sandbox:\n{listing}"))
    }
}
