//! Tools
//!
//! Responsibilities:
//! - Tool trait shared by every callable tool
//! - Input models generated from JSON schemas
//! - Wrapping remote MCP tools
//! - Registry handed to the agent

mod trait_mod;
pub use trait_mod::{Tool, ToolError, ToolMetadata, ToolParams, ToolResult};

pub mod schema;
pub use schema::{FieldType, InputField, InputModel, ValidationError, model_name_for_tool};

pub mod mcp_tool;
pub use mcp_tool::{DEFAULT_TOOL_DESCRIPTION, McpTool};

pub mod registry;
pub use registry::{RegistrySummary, ToolRegistry};
