//! Utility helpers for the agent loop.
//!
//! Pure functions for text truncation, sanitization, and message management.

use crate::llm::provider::{Message, MessageRole, ToolCall};

/// Maximum characters for tool output before truncation.
pub(crate) const MAX_TOOL_OUTPUT_CHARS: usize = 100_000;

/// Maximum number of messages to keep in the conversation history.
/// System prompt is always preserved. When exceeded, older messages (after system
/// prompt) are replaced with a summary placeholder.
pub(crate) const MAX_CONVERSATION_MESSAGES: usize = 40;

/// Truncate content for log lines.
pub(crate) fn truncate_for_log(content: &str, max: usize) -> String {
    let one_line = content
        .replace(['\n', '\r'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if one_line.chars().count() <= max {
        return one_line;
    }
    let mut out = one_line.chars().take(max).collect::<String>();
    out.push_str("...");
    out
}

/// Sanitize tool output: truncate if too long, wrap with XML boundary tags.
pub(crate) fn sanitize_tool_output(content: &str) -> String {
    let truncated = if content.chars().count() > MAX_TOOL_OUTPUT_CHARS {
        let mut out = content
            .chars()
            .take(MAX_TOOL_OUTPUT_CHARS)
            .collect::<String>();
        out.push_str("\n[truncated: output exceeded limit]");
        out
    } else {
        content.to_string()
    };
    format!("<tool_output>\n{}\n</tool_output>", truncated)
}

/// Truncate messages to bounded size, preserving system prompt and recent history.
///
/// - Keeps the first message if it's a system prompt
/// - Keeps the most recent `max_messages` non-system messages
/// - Replaces removed messages with a single placeholder
///
/// A cut never lands between an assistant tool-call message and its tool
/// results; the window is widened backwards instead.
pub(crate) fn truncate_messages(messages: &mut Vec<Message>, max_messages: usize) {
    let system_count = if messages
        .first()
        .is_some_and(|m| m.role == MessageRole::System)
    {
        1
    } else {
        0
    };

    let non_system = messages.len() - system_count;
    if non_system <= max_messages {
        return;
    }

    let mut cut = system_count + (non_system - max_messages);
    while cut > system_count && messages[cut].role == MessageRole::Tool {
        cut -= 1;
    }
    if cut == system_count {
        return;
    }

    let placeholder = Message::user(
        "[earlier conversation history omitted for context window management]",
    );
    messages.splice(system_count..cut, [placeholder]);
}

/// Build a human-readable summary of planned tool calls.
pub(crate) fn summarize_tool_calls(tool_calls: &[ToolCall]) -> String {
    let mut parts = Vec::new();
    for call in tool_calls.iter().take(3) {
        let arg = truncate_for_log(&call.function.arguments, 60);
        parts.push(format!("{}({})", call.function.name, arg));
    }
    let mut summary = parts.join(", ");
    if tool_calls.len() > 3 {
        summary.push_str(&format!(", ... +{} more", tool_calls.len() - 3));
    }
    summary
}
