//! jobassist Interface
//!
//! Responsibilities:
//! - CLI
//! - Assistant session (lazy MCP connection + agent)
//! - Web chat server
//!
//! Layout:
//! - cli: command line entry
//! - session: session manager
//! - history: chat history normalization
//! - server: axum routes

pub mod cli;
pub mod history;
pub mod server;
pub mod session;

#[cfg(test)]
mod test_support;

pub use cli::{CliError, run_cli};
pub use history::{ChatTurn, normalize_history};
pub use server::{router, run_server, serve};
pub use session::{AssistantSession, ProviderFactory, SessionError, default_provider_factory};
