//! LLM integration module

pub mod provider;

pub use provider::*;
