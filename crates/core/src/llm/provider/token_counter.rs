//! Simple Token Counter
//!
//! Approximate token counting for LLM models.
//! Uses character-based estimation with model-specific context limits.

use super::*;

/// Simple token counter using character-based estimation
#[derive(Debug, Clone, Default)]
pub struct SimpleTokenCounter;

impl SimpleTokenCounter {
    pub fn new() -> Self {
        Self
    }
}

impl TokenCounter for SimpleTokenCounter {
    fn count_messages(&self, messages: &[Message], model: &str) -> usize {
        let mut total = 0;

        for message in messages {
            // Role and formatting overhead
            total += 3;

            total += self.count_text(&message.content, model);

            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    total += self.count_text(&call.function.name, model);
                    total += self.count_text(&call.function.arguments, model);
                }
            }
        }

        total
    }

    fn count_text(&self, text: &str, _model: &str) -> usize {
        // Simple estimation: average 4 characters per token
        (text.len() / 4).max(1)
    }

    fn get_max_tokens(&self, model: &str) -> usize {
        match model {
            m if m.starts_with("gemini-2") || m.starts_with("gemini-1.5") => 1_048_576,
            m if m.starts_with("gemini") => 32_768,
            m if m.contains("gpt-4o") || m.contains("gpt-4.1") => 128_000,
            m if m.contains("gpt-4") && m.contains("turbo") => 128_000,
            m if m.contains("gpt-4") => 8_192,
            _ => 128_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_token_counter() {
        let counter = SimpleTokenCounter::new();

        let tokens = counter.count_text("Hello world", "gemini-2.5-flash");
        assert!(tokens > 0);
        assert!(tokens <= 10);
    }

    #[test]
    fn test_message_counting_includes_tool_calls() {
        let counter = SimpleTokenCounter::new();
        let plain = vec![Message::system("You are a helpful assistant."), Message::user("Hello!")];
        let base = counter.count_messages(&plain, "gemini-2.5-flash");
        assert!(base > 0);

        let mut with_call = plain.clone();
        with_call.push(Message {
            tool_calls: Some(vec![ToolCall {
                id: "call-1".to_string(),
                call_type: "function".to_string(),
                function: ToolCallFunction {
                    name: "search_jobs".to_string(),
                    arguments: r#"{"what": "data analyst", "where": "Singapore"}"#.to_string(),
                },
            }]),
            ..Message::assistant("")
        });
        assert!(counter.count_messages(&with_call, "gemini-2.5-flash") > base + 3);
    }

    #[test]
    fn test_max_tokens() {
        let counter = SimpleTokenCounter::new();

        assert_eq!(counter.get_max_tokens("gemini-2.5-flash"), 1_048_576);
        assert_eq!(counter.get_max_tokens("gpt-4"), 8_192);
        assert_eq!(counter.get_max_tokens("gpt-4o"), 128_000);
    }
}
