//! Sandboxed file tools over JSON-RPC 2.0 stdio.
//!
//! One server binary exposes `write_file`, `read_file`, and `list_files`
//! (plus optional relay mailbox tools) confined to a single boundary
//! directory, speaking both `Content-Length`-framed and newline-delimited
//! JSON-RPC from the same stream. The companion client spawns the server
//! as a subprocess and correlates responses to requests by id.

pub mod client;
pub mod config;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod sandbox;
pub mod schema;
pub mod server;
pub mod transport;
