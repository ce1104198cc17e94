//! jobassist runtime - remote tools
//!
//! Responsibilities:
//! - MCP client over streamable HTTP
//! - Tool trait, input models and registry
//!
//! Layout:
//! - mcp/: JSON-RPC transport, client, `ToolServer` seam
//! - tools/: schema conversion, MCP tool wrapper, registry

pub mod mcp;
pub mod tools;

pub use mcp::{
    CallToolResult, ContentItem, McpClient, McpClientConfig, McpConnector, McpError,
    ToolDescriptor, ToolServer, ToolServerConnector,
};
pub use tools::{InputModel, McpTool, Tool, ToolError, ToolRegistry, ToolResult, ValidationError};
