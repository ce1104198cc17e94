//! Chat history normalization
//!
//! Chat front ends send prior turns in several shapes. They are folded into
//! ordered `(user, assistant)` pairs; entries of any other shape are skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One completed exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
}

impl ChatTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Accepted shapes:
/// - `{"user"|"input": .., "assistant"|"output": ..}`
/// - `[user, assistant, ...]`
/// - `{"role": "user"|"assistant", "content": ..}` messages, paired in order
pub fn normalize_history(entries: &[Value]) -> Vec<ChatTurn> {
    let mut turns = Vec::new();
    let mut pending_user: Option<String> = None;

    for entry in entries {
        match entry {
            Value::Object(map) if map.contains_key("role") => {
                let content = map.get("content").map(render_content).unwrap_or_default();
                match map.get("role").and_then(Value::as_str) {
                    Some("user") => {
                        if let Some(user) = pending_user.replace(content) {
                            turns.push(ChatTurn::new(user, ""));
                        }
                    }
                    Some("assistant") => {
                        turns.push(ChatTurn::new(pending_user.take().unwrap_or_default(), content));
                    }
                    _ => {}
                }
            }
            Value::Object(map) => {
                let user = first_non_empty(map.get("user"), map.get("input"));
                let assistant = first_non_empty(map.get("assistant"), map.get("output"));
                if user.is_none() && assistant.is_none() && !has_pair_keys(map) {
                    continue;
                }
                flush(&mut turns, &mut pending_user);
                turns.push(ChatTurn::new(
                    user.unwrap_or_default(),
                    assistant.unwrap_or_default(),
                ));
            }
            Value::Array(items) if items.len() >= 2 => {
                flush(&mut turns, &mut pending_user);
                turns.push(ChatTurn::new(render(&items[0]), render(&items[1])));
            }
            _ => {}
        }
    }

    flush(&mut turns, &mut pending_user);
    turns
}

fn flush(turns: &mut Vec<ChatTurn>, pending_user: &mut Option<String>) {
    if let Some(user) = pending_user.take() {
        turns.push(ChatTurn::new(user, ""));
    }
}

fn has_pair_keys(map: &serde_json::Map<String, Value>) -> bool {
    ["user", "input", "assistant", "output"]
        .iter()
        .any(|key| map.contains_key(*key))
}

fn first_non_empty(primary: Option<&Value>, fallback: Option<&Value>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(render)
        .find(|text| !text.is_empty())
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Message content may be a string, a `{text}` part or a list of parts
fn render_content(value: &Value) -> String {
    match value {
        Value::Object(map) => match map.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        },
        Value::Array(parts) => parts
            .iter()
            .map(render_content)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => render(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dict_entries() {
        let turns = normalize_history(&[
            json!({"user": "Find jobs", "assistant": "Here are 3"}),
            json!({"input": "In Singapore?", "output": "Yes"}),
            json!({"user": "", "input": "fallback", "assistant": null}),
        ]);
        assert_eq!(
            turns,
            vec![
                ChatTurn::new("Find jobs", "Here are 3"),
                ChatTurn::new("In Singapore?", "Yes"),
                ChatTurn::new("fallback", ""),
            ]
        );
    }

    #[test]
    fn test_pair_entries() {
        let turns = normalize_history(&[
            json!(["hi", "hello"]),
            json!(["question", null, "ignored"]),
            json!([42, true]),
        ]);
        assert_eq!(
            turns,
            vec![
                ChatTurn::new("hi", "hello"),
                ChatTurn::new("question", ""),
                ChatTurn::new("42", "true"),
            ]
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let turns = normalize_history(&[
            json!("just a string"),
            json!(["only one"]),
            json!(7),
            Value::Null,
            json!({"unrelated": 1}),
            json!(["a", "b"]),
        ]);
        assert_eq!(turns, vec![ChatTurn::new("a", "b")]);
    }

    #[test]
    fn test_role_messages_are_folded() {
        let turns = normalize_history(&[
            json!({"role": "user", "content": "Search data jobs"}),
            json!({"role": "assistant", "content": "Found 10"}),
            json!({"role": "user", "content": [{"type": "text", "text": "Which companies?"}]}),
            json!({"role": "assistant", "content": {"text": "Acme"}}),
            json!({"role": "system", "content": "ignored"}),
            json!({"role": "user", "content": "dangling"}),
        ]);
        assert_eq!(
            turns,
            vec![
                ChatTurn::new("Search data jobs", "Found 10"),
                ChatTurn::new("Which companies?", "Acme"),
                ChatTurn::new("dangling", ""),
            ]
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let first = normalize_history(&[
            json!({"user": "a", "assistant": "b"}),
            json!(["c", "d"]),
            json!({"role": "user", "content": "e"}),
            json!({"role": "assistant", "content": "f"}),
        ]);
        let rendered: Vec<Value> = first
            .iter()
            .map(|turn| serde_json::to_value(turn).unwrap())
            .collect();
        assert_eq!(normalize_history(&rendered), first);
    }

    #[test]
    fn test_empty_history() {
        assert!(normalize_history(&[]).is_empty());
    }
}
