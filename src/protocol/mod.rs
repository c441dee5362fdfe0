pub mod message;
pub mod request;
pub mod response;

pub use message::Message;
pub use request::{ClientInfo, InitializeParams, Notification, Request, RpcId, ToolCallParams};
pub use response::{ErrorResponse, Response, RpcError, ToolResult, ToolResultContent};
