//! Cross-process text relay ("mailbox") capabilities.
//!
//! Two well-known files inside the sandbox form a half-duplex channel with
//! an external peer: requests are appended to the input file, replies are
//! read from the output file. The peer is expected to poll the input file
//! on its own schedule; nothing here blocks on it.

use std::fs::OpenOptions;
use std::io::Write;

use chrono::Local;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::info;

use crate::protocol::ToolResult;
use crate::registry::{ToolArgs, ToolContext, ToolDescriptor};
use crate::sandbox::Sandbox;

pub const INPUT_FILE: &str = "RELAY_INPUT.TXT";
pub const OUTPUT_FILE: &str = "RELAY_OUTPUT.TXT";

/// Seed the mailbox files so both sides have a place to look before the
/// first exchange. Existing files are left untouched.
pub fn ensure_mailbox(sandbox: &Sandbox) -> std::io::Result<()> {
    let input = sandbox.root().join(INPUT_FILE);
    if !input.exists() {
        std::fs::write(&input, format!("# {INPUT_FILE} - requests to the relay peer\n"))?;
    }
    let output = sandbox.root().join(OUTPUT_FILE);
    if !output.exists() {
        std::fs::write(
            &output,
            format!("# {OUTPUT_FILE} - replies from the relay peer\n"),
        )?;
    }
    Ok(())
}

pub fn write_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "relay_write".into(),
        description: "Send a message to the relay peer".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Message to queue for the relay peer"
                }
            },
            "required": ["message"]
        }),
    }
}

pub fn read_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "relay_read".into(),
        description: "Read the relay peer's response".into(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn status_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "relay_status".into(),
        description: "Check relay mailbox status".into(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn write_handler(ctx: &ToolContext, args: ToolArgs) -> BoxFuture<'_, ToolResult> {
    Box::pin(handle_write(ctx, args))
}

pub fn read_handler(ctx: &ToolContext, args: ToolArgs) -> BoxFuture<'_, ToolResult> {
    Box::pin(handle_read(ctx, args))
}

pub fn status_handler(ctx: &ToolContext, args: ToolArgs) -> BoxFuture<'_, ToolResult> {
    Box::pin(handle_status(ctx, args))
}

pub async fn handle_write(ctx: &ToolContext, args: ToolArgs) -> ToolResult {
    let Some(message) = args.get("message").and_then(Value::as_str) else {
        return ToolResult::error("Error: message is required");
    };

    let path = ctx.sandbox.root().join(INPUT_FILE);
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let line = format!("[{timestamp}] {message}\n");

    let appended = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| f.write_all(line.as_bytes()));

    match appended {
        Ok(()) => {
            info!(chars = message.chars().count(), "queued relay message");
            ToolResult::text(format!(
                "Message queued for the relay peer at {timestamp}:\n{message}\n\nFile: {}",
                path.display()
            ))
        }
        Err(e) => ToolResult::error(format!("Error writing relay message: {e}")),
    }
}

pub async fn handle_read(ctx: &ToolContext, _args: ToolArgs) -> ToolResult {
    let path = ctx.sandbox.root().join(OUTPUT_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            info!(chars = content.chars().count(), "read relay output");
            ToolResult::text(format!("Relay output (from {}):\n\n{content}", path.display()))
        }
        Err(e) => ToolResult::error(format!("Error reading relay output: {e}")),
    }
}

pub async fn handle_status(ctx: &ToolContext, _args: ToolArgs) -> ToolResult {
    let input = ctx.sandbox.root().join(INPUT_FILE);
    let output = ctx.sandbox.root().join(OUTPUT_FILE);

    let describe = |path: &std::path::Path| match std::fs::metadata(path) {
        Ok(meta) => (true, meta.len()),
        Err(_) => (false, 0),
    };
    let (input_exists, input_size) = describe(&input);
    let (output_exists, output_size) = describe(&output);

    ToolResult::text(format!(
        "Relay status:\n\n\
         INPUT:  {}\n        Exists: {input_exists}\n        Size: {input_size} bytes\n\n\
         OUTPUT: {}\n        Exists: {output_exists}\n        Size: {output_size} bytes",
        input.display(),
        output.display(),
    ))
}
