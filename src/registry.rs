//! Declarative tool registry.
//!
//! The server's capability set is assembled once at startup; the plain and
//! relay server variants differ only in which capabilities get registered,
//! not in any of the dispatch machinery.

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::protocol::ToolResult;
use crate::sandbox::Sandbox;
use crate::schema;

/// Description of an invocable tool, advertised via `tools/list`.
/// Constructed once at startup and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Shared state handed to every tool handler.
pub struct ToolContext {
    pub sandbox: Sandbox,
}

/// Named arguments, already validated against the tool's input schema.
pub type ToolArgs = Map<String, Value>;

pub type ToolHandler = for<'a> fn(&'a ToolContext, ToolArgs) -> BoxFuture<'a, ToolResult>;

struct Tool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Ordered capability set. Registration order is the `tools/list` order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a capability. Names must be unique within the registry.
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: ToolHandler) {
        debug_assert!(
            self.find(&descriptor.name).is_none(),
            "duplicate tool name: {}",
            descriptor.name
        );
        self.tools.push(Tool { descriptor, handler });
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Invoke a named tool. Domain failures come back as error-flavored
    /// content — protocol errors are the dispatcher's business, not ours.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
        ctx: &ToolContext,
    ) -> ToolResult {
        let Some(tool) = self.find(name) else {
            return ToolResult::error(format!("Unknown tool: {name}"));
        };

        let arguments = arguments.unwrap_or_else(|| Value::Object(Map::new()));
        if let Err(e) = schema::validate_arguments(&tool.descriptor.input_schema, &arguments) {
            return ToolResult::error(format!("Invalid arguments for {name}: {e}"));
        }

        // Every input schema declares `type: object`, so validation has
        // already rejected anything else.
        let Value::Object(args) = arguments else {
            return ToolResult::error(format!("Invalid arguments for {name}: expected an object"));
        };

        (tool.handler)(ctx, args).await
    }

    fn find(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }
}
