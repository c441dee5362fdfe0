//! Scripted exercise of a bridge server.
//!
//! Spawns the given server command, performs the handshake, then walks the
//! file tools end to end: write, list, read, a second write, and a read of
//! a file that does not exist.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use mcp_file_bridge::client::{BridgeClient, ClientError};
use mcp_file_bridge::protocol::ToolResult;
use serde_json::{json, Value};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "bridge-client")]
#[command(about = "Exercise an mcp-file-bridge server over stdio")]
struct Args {
    /// Per-call timeout in seconds
    #[arg(long, default_value = "5")]
    timeout_secs: u64,

    /// Sandbox directory to hand the server
    #[arg(long)]
    sandbox_dir: Option<PathBuf>,

    /// Ask the server to register its relay mailbox tools
    #[arg(long)]
    relay: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Server command and arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(args).await {
        eprintln!("bridge-client: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let timeout = Duration::from_secs(args.timeout_secs);

    let mut envs = Vec::new();
    if let Some(dir) = &args.sandbox_dir {
        envs.push((
            "FILEBRIDGE_SANDBOX_ROOT".to_string(),
            dir.display().to_string(),
        ));
    }
    if args.relay {
        envs.push(("FILEBRIDGE_RELAY_TOOLS".to_string(), "1".to_string()));
    }

    let (program, program_args) = args
        .command
        .split_first()
        .expect("clap requires at least one command element");
    let mut client = BridgeClient::spawn(program, program_args, &envs)?;

    let info = client.initialize(timeout).await?;
    println!(
        "initialized: {} {} (protocol {})",
        field(&info, "/serverInfo/name"),
        field(&info, "/serverInfo/version"),
        field(&info, "/protocolVersion"),
    );

    let tools = client
        .call("tools/list", None, timeout)
        .await?
        .into_result()?;
    println!("\ntools:");
    if let Some(list) = tools.pointer("/tools").and_then(Value::as_array) {
        for tool in list {
            println!(
                "  - {}: {}",
                field(tool, "/name"),
                field(tool, "/description"),
            );
        }
    }

    let data_json = serde_json::to_string_pretty(&json!({ "test": "data", "number": 42 }))
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;

    let steps: Vec<(&str, Value)> = vec![
        (
            "write_file",
            json!({
                "filename": "test.txt",
                "content": "Hello from the bridge!\nThis is a test file.\nLine 3 here!"
            }),
        ),
        ("list_files", json!({})),
        ("read_file", json!({ "filename": "test.txt" })),
        (
            "write_file",
            json!({ "filename": "data.json", "content": data_json }),
        ),
        ("list_files", json!({})),
        ("read_file", json!({ "filename": "nonexistent.txt" })),
    ];

    for (tool, arguments) in steps {
        println!("\n=> {tool}");
        let result = client.call_tool(tool, arguments, timeout).await?;
        print_result(&result);
    }

    if args.relay {
        println!("\n=> relay_status");
        let result = client.call_tool("relay_status", json!({}), timeout).await?;
        print_result(&result);
    }

    let status = client.shutdown().await?;
    println!("\nserver exited: {status}");
    Ok(())
}

fn print_result(result: &ToolResult) {
    let marker = if result.is_error { "error" } else { "ok" };
    for item in &result.content {
        println!("[{marker}] {}", item.text);
    }
}

fn field<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("unknown")
}
